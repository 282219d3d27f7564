//! Leaf values and native-order element I/O.
//!
//! A [`Value`] is one leaf of a record: a flat, row-major run of elements of
//! a single primitive type plus the shape and metadata that travel with it.
//! [`Elements`] knows how to write itself to and read itself back from a byte
//! buffer in the host's native byte order. Booleans occupy one byte; any
//! non-zero byte reads back as `true`.

use bytes::{Buf, BufMut};

use crate::record::Record;
use crate::schema::{normalize_dims, FieldMeta};
use crate::types::{FieldType, PrimitiveType};

fn put_bool<B: BufMut>(buf: &mut B, value: bool) {
    buf.put_u8(u8::from(value));
}

fn get_bool<B: Buf>(buf: &mut B) -> bool {
    buf.get_u8() != 0
}

// One variant per primitive type, with the bytes accessors that move it.
macro_rules! define_elements {
    ($( $variant:ident($ty:ty) => $put:path, $get:path; )*) => {
        /// Typed element storage for one leaf, row-major.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Elements {
            $( $variant(Vec<$ty>), )*
        }

        impl Elements {
            /// The primitive type of the elements.
            pub fn primitive(&self) -> PrimitiveType {
                match self {
                    $( Elements::$variant(_) => PrimitiveType::$variant, )*
                }
            }

            /// Number of elements.
            pub fn len(&self) -> usize {
                match self {
                    $( Elements::$variant(v) => v.len(), )*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// `count` zero (or `false`) elements of type `prim`.
            pub fn zeroed(prim: PrimitiveType, count: usize) -> Self {
                match prim {
                    $( PrimitiveType::$variant => Elements::$variant(vec![<$ty>::default(); count]), )*
                }
            }

            /// Write every element in native byte order.
            pub fn put_ne<B: BufMut>(&self, buf: &mut B) {
                match self {
                    $( Elements::$variant(v) => {
                        for x in v {
                            $put(buf, *x);
                        }
                    } )*
                }
            }

            /// Read `count` elements of type `prim` in native byte order.
            ///
            /// The caller guarantees `buf` holds at least
            /// `prim.width() * count` bytes.
            pub fn get_ne<B: Buf>(prim: PrimitiveType, count: usize, buf: &mut B) -> Self {
                match prim {
                    $( PrimitiveType::$variant => {
                        Elements::$variant((0..count).map(|_| $get(buf)).collect())
                    } )*
                }
            }
        }

        $(
            impl From<Vec<$ty>> for Elements {
                fn from(v: Vec<$ty>) -> Self {
                    Elements::$variant(v)
                }
            }

            impl From<$ty> for Elements {
                fn from(x: $ty) -> Self {
                    Elements::$variant(vec![x])
                }
            }

            impl From<$ty> for Value {
                fn from(x: $ty) -> Self {
                    Value::scalar(x)
                }
            }

            impl From<$ty> for Record {
                fn from(x: $ty) -> Self {
                    Record::Leaf(Value::scalar(x))
                }
            }
        )*
    };
}

define_elements! {
    Boolean(bool) => put_bool, get_bool;
    Int8(i8) => BufMut::put_i8, Buf::get_i8;
    UInt8(u8) => BufMut::put_u8, Buf::get_u8;
    Int16(i16) => BufMut::put_i16_ne, Buf::get_i16_ne;
    UInt16(u16) => BufMut::put_u16_ne, Buf::get_u16_ne;
    Int32(i32) => BufMut::put_i32_ne, Buf::get_i32_ne;
    UInt32(u32) => BufMut::put_u32_ne, Buf::get_u32_ne;
    Int64(i64) => BufMut::put_i64_ne, Buf::get_i64_ne;
    UInt64(u64) => BufMut::put_u64_ne, Buf::get_u64_ne;
    Single(f32) => BufMut::put_f32_ne, Buf::get_f32_ne;
    Double(f64) => BufMut::put_f64_ne, Buf::get_f64_ne;
}

/// One leaf of a record.
///
/// Construction does not check that the element count matches the
/// dimensions; schema extraction does, and reports the offending path.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    elements: Elements,
    dims: Vec<usize>,
    complex: bool,
    enumeration: Option<String>,
    meta: FieldMeta,
}

impl Value {
    /// A single element with dimensions `[1]`.
    pub fn scalar(x: impl Into<Elements>) -> Self {
        Self::array(x, vec![1])
    }

    /// Elements in row-major order with the given shape. A shape holding a
    /// single element is stored as `[1]`.
    pub fn array(elements: impl Into<Elements>, dims: Vec<usize>) -> Self {
        Self {
            elements: elements.into(),
            dims: normalize_dims(&dims),
            complex: false,
            enumeration: None,
            meta: FieldMeta::default(),
        }
    }

    /// A 1-D vector; dimensions are `[len]`.
    pub fn vector(elements: impl Into<Elements>) -> Self {
        let elements = elements.into();
        let len = elements.len();
        Self::array(elements, vec![len])
    }

    /// Enumeration tags of type `name`, stored as their integer elements.
    pub fn enumerated(name: impl Into<String>, elements: impl Into<Elements>) -> Self {
        let mut value = Self::scalar(elements);
        value.dims = vec![value.elements.len()];
        value.enumeration = Some(name.into());
        value
    }

    pub fn with_dims(mut self, dims: Vec<usize>) -> Self {
        self.dims = normalize_dims(&dims);
        self
    }

    /// Flag the value as complex. Metadata only: no imaginary part is stored.
    pub fn with_complex(mut self, complex: bool) -> Self {
        self.complex = complex;
        self
    }

    pub fn with_meta(mut self, meta: FieldMeta) -> Self {
        self.meta = meta;
        self
    }

    pub(crate) fn with_enumeration(mut self, enumeration: Option<String>) -> Self {
        self.enumeration = enumeration;
        self
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn is_complex(&self) -> bool {
        self.complex
    }

    pub fn enumeration(&self) -> Option<&str> {
        self.enumeration.as_deref()
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The semantic type this value reports.
    pub fn field_type(&self) -> FieldType {
        let prim = self.elements.primitive();
        match &self.enumeration {
            Some(name) => FieldType::Enumerated {
                name: name.clone(),
                storage: Some(prim),
            },
            None => FieldType::Primitive(prim),
        }
    }

    /// Type and shape, e.g. `int32[2x3]`.
    pub fn describe(&self) -> String {
        describe_shape(&self.field_type(), &self.dims)
    }
}

/// Render a type and shape for diagnostics.
pub(crate) fn describe_shape(ty: &FieldType, dims: &[usize]) -> String {
    let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    format!("{}[{}]", ty, dims.join("x"))
}
