//! Source artifacts for a target environment.
//!
//! A [`TargetEmitter`] turns a [`CodecPlan`] into three pieces of source:
//!
//! - a **definition** with one field per schema field and zero defaults
//! - a **packer** that consumes the definition and produces `(bytes, length)`
//! - an **unpacker** that consumes `(bytes, length)` and produces the
//!   definition plus a success flag, applying the same two-sided length
//!   check as [`crate::decoder::decode`]
//!
//! [`RustEmitter`] renders them as Rust. Field paths become identifiers by
//! replacing `.` with `__` (`b.x` -> `b__x`). Fields with more than one
//! element become fixed-size arrays in row-major order.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{EmitError, Result};
use crate::layout::{CodecPlan, PlannedField};
use crate::types::PrimitiveType;

/// Separator substituted for `.` in generated identifiers.
pub const IDENT_SEPARATOR: &str = "__";

// Keywords that cannot be written as raw identifiers either.
const RESERVED: [&str; 5] = ["_", "self", "Self", "super", "crate"];

/// The three generated sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub definition: String,
    pub packer: String,
    pub unpacker: String,
}

impl Artifacts {
    /// All three sources as one module.
    pub fn combined(&self) -> String {
        format!("{}\n{}\n{}", self.definition, self.packer, self.unpacker)
    }

    /// Write `<stem>_definition.rs`, `<stem>_pack.rs` and `<stem>_unpack.rs`
    /// into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(3);
        for (suffix, source) in [
            ("definition", &self.definition),
            ("pack", &self.packer),
            ("unpack", &self.unpacker),
        ] {
            let path = dir.join(format!("{}_{}.rs", stem, suffix));
            fs::write(&path, source)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Produces definition, packer and unpacker sources for a plan.
pub trait TargetEmitter {
    fn emit(&self, plan: &CodecPlan) -> Result<Artifacts>;
}

/// Emits a Rust struct with `pack_*`/`unpack_*` functions.
#[derive(Debug, Clone)]
pub struct RustEmitter {
    type_name: String,
}

impl RustEmitter {
    /// `type_name` names the generated struct; the functions and the frame
    /// size constant are derived from it.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl Default for RustEmitter {
    fn default() -> Self {
        Self::new("Frame")
    }
}

/// One planned field with its generated identifier.
struct Member<'p> {
    ident: Ident,
    planned: &'p PlannedField,
}

impl Member<'_> {
    fn is_array(&self) -> bool {
        self.planned.element_count > 1
    }

    fn element_type(&self) -> TokenStream {
        rust_type(self.planned.storage)
    }

    fn field_type(&self) -> TokenStream {
        let ty = self.element_type();
        if self.is_array() {
            let n = Literal::usize_unsuffixed(self.planned.element_count);
            quote!([#ty; #n])
        } else {
            ty
        }
    }

    fn default_value(&self) -> TokenStream {
        let zero = zero_literal(self.planned.storage);
        if self.is_array() {
            let n = Literal::usize_unsuffixed(self.planned.element_count);
            quote!([#zero; #n])
        } else {
            zero
        }
    }

    fn docs(&self) -> Vec<String> {
        let field = &self.planned.field;
        let mut docs = vec![format!(
            " `{}`: {} at offset {}, {} bytes",
            field.name, field.ty, self.planned.offset, self.planned.width_bytes
        )];

        if self.is_array() {
            let dims: Vec<String> = field.dims.iter().map(|d| d.to_string()).collect();
            docs.push(format!(" Shape {}, row-major", dims.join("x")));
        }
        if field.is_complex {
            docs.push(" Complex; real part only".to_string());
        }
        if let Some(unit) = &field.meta.unit {
            docs.push(format!(" Unit: {}", unit));
        }
        match (field.meta.min, field.meta.max) {
            (Some(min), Some(max)) => docs.push(format!(" Range: {} to {}", min, max)),
            (Some(min), None) => docs.push(format!(" Minimum: {}", min)),
            (None, Some(max)) => docs.push(format!(" Maximum: {}", max)),
            (None, None) => {}
        }
        if let Some(description) = &field.meta.description {
            docs.push(format!(" {}", description));
        }
        docs
    }

    fn pack(&self) -> TokenStream {
        let ident = &self.ident;
        let offset = Literal::usize_unsuffixed(self.planned.offset);
        let width = Literal::usize_unsuffixed(self.planned.storage.width());
        let is_bool = self.planned.storage == PrimitiveType::Boolean;

        match (self.is_array(), is_bool) {
            (false, true) => quote! {
                bytes[#offset] = u8::from(value.#ident);
            },
            (false, false) => quote! {
                bytes[#offset..#offset + #width].copy_from_slice(&value.#ident.to_ne_bytes());
            },
            (true, true) => quote! {
                for (i, x) in value.#ident.iter().enumerate() {
                    bytes[#offset + i] = u8::from(*x);
                }
            },
            (true, false) => quote! {
                for (i, x) in value.#ident.iter().enumerate() {
                    let start = #offset + i * #width;
                    bytes[start..start + #width].copy_from_slice(&x.to_ne_bytes());
                }
            },
        }
    }

    fn unpack(&self) -> TokenStream {
        let ident = &self.ident;
        let ty = self.element_type();
        let offset = Literal::usize_unsuffixed(self.planned.offset);
        let width = Literal::usize_unsuffixed(self.planned.storage.width());
        let is_bool = self.planned.storage == PrimitiveType::Boolean;

        match (self.is_array(), is_bool) {
            (false, true) => quote! {
                value.#ident = bytes[#offset] != 0;
            },
            (false, false) => quote! {
                let mut raw = [0u8; #width];
                raw.copy_from_slice(&bytes[#offset..#offset + #width]);
                value.#ident = #ty::from_ne_bytes(raw);
            },
            (true, true) => quote! {
                for (i, x) in value.#ident.iter_mut().enumerate() {
                    *x = bytes[#offset + i] != 0;
                }
            },
            (true, false) => quote! {
                for (i, x) in value.#ident.iter_mut().enumerate() {
                    let start = #offset + i * #width;
                    let mut raw = [0u8; #width];
                    raw.copy_from_slice(&bytes[start..start + #width]);
                    *x = #ty::from_ne_bytes(raw);
                }
            },
        }
    }
}

impl TargetEmitter for RustEmitter {
    fn emit(&self, plan: &CodecPlan) -> Result<Artifacts> {
        let type_ident = type_ident(&self.type_name)?;
        let snake = snake_case(&self.type_name);
        let frame_const = format_ident!("{}_FRAME_BYTES", snake.to_uppercase());
        let pack_fn = format_ident!("pack_{}", snake);
        let unpack_fn = format_ident!("unpack_{}", snake);
        let total = Literal::usize_unsuffixed(plan.total_bytes());

        let members = members(plan)?;

        let struct_doc = format!(
            " Frame of {} fields, {} bytes in native byte order.",
            members.len(),
            plan.total_bytes()
        );
        let fields = members.iter().map(|m| {
            let ident = &m.ident;
            let ty = m.field_type();
            let docs = m.docs();
            quote! {
                #( #[doc = #docs] )*
                pub #ident: #ty,
            }
        });
        let defaults = members.iter().map(|m| {
            let ident = &m.ident;
            let default = m.default_value();
            quote!(#ident: #default,)
        });

        let definition = quote! {
            /// Size of one encoded frame in bytes.
            pub const #frame_const: usize = #total;

            #[doc = #struct_doc]
            #[derive(Clone, Debug, PartialEq)]
            pub struct #type_ident {
                #( #fields )*
            }

            impl Default for #type_ident {
                fn default() -> Self {
                    Self {
                        #( #defaults )*
                    }
                }
            }
        };

        let packs = members.iter().map(Member::pack);
        let packer = quote! {
            /// Encode `value` into a frame; returns the bytes and their length.
            pub fn #pack_fn(value: &#type_ident) -> ([u8; #frame_const], usize) {
                let mut bytes = [0u8; #frame_const];
                #( #packs )*
                (bytes, #frame_const)
            }
        };

        let unpacks = members.iter().map(Member::unpack);
        let unpacker = quote! {
            /// Decode a frame. Succeeds only if `length` equals the frame size
            /// and `bytes` holds at least `length` bytes; otherwise returns the
            /// default value and `false`.
            pub fn #unpack_fn(bytes: &[u8], length: usize) -> (#type_ident, bool) {
                let mut value = #type_ident::default();
                if length != #frame_const || bytes.len() < length {
                    return (value, false);
                }
                #( #unpacks )*
                (value, true)
            }
        };

        debug!(
            type_name = %self.type_name,
            fields = members.len(),
            "emitted rust artifacts"
        );

        Ok(Artifacts {
            definition: render(definition)?,
            packer: render(packer)?,
            unpacker: render(unpacker)?,
        })
    }
}

fn members(plan: &CodecPlan) -> Result<Vec<Member<'_>>> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(plan.len());
    let mut members = Vec::with_capacity(plan.len());

    for planned in plan.fields() {
        let ident = field_ident(planned.name())?;
        let key = ident.to_string();
        let key = key.strip_prefix("r#").unwrap_or(&key).to_string();

        if let Some(first) = seen.insert(key.clone(), planned.name()) {
            return Err(EmitError::IdentCollision {
                first: first.to_string(),
                second: planned.name().to_string(),
                ident: key,
            }
            .into());
        }
        members.push(Member { ident, planned });
    }
    Ok(members)
}

/// Map a dotted field path to a Rust identifier.
pub fn field_ident(path: &str) -> Result<Ident> {
    let name = path.replace('.', IDENT_SEPARATOR);
    let invalid = || EmitError::InvalidIdent { name: name.clone() };

    if syn::parse_str::<syn::Ident>(&name).is_ok() {
        return Ok(Ident::new(&name, Span::call_site()));
    }

    // Keywords are still usable in raw form
    if RESERVED.contains(&name.as_str()) {
        return Err(invalid().into());
    }
    syn::parse_str::<syn::Ident>(&format!("r#{}", name)).map_err(|_| invalid())?;
    Ok(Ident::new_raw(&name, Span::call_site()))
}

fn type_ident(name: &str) -> Result<Ident> {
    syn::parse_str::<syn::Ident>(name)
        .map(|_| Ident::new(name, Span::call_site()))
        .map_err(|_| {
            EmitError::InvalidIdent {
                name: name.to_string(),
            }
            .into()
        })
}

/// `TelemetryFrame` -> `telemetry_frame`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn rust_type(prim: PrimitiveType) -> TokenStream {
    match prim {
        PrimitiveType::Boolean => quote!(bool),
        PrimitiveType::Int8 => quote!(i8),
        PrimitiveType::UInt8 => quote!(u8),
        PrimitiveType::Int16 => quote!(i16),
        PrimitiveType::UInt16 => quote!(u16),
        PrimitiveType::Int32 => quote!(i32),
        PrimitiveType::UInt32 => quote!(u32),
        PrimitiveType::Int64 => quote!(i64),
        PrimitiveType::UInt64 => quote!(u64),
        PrimitiveType::Single => quote!(f32),
        PrimitiveType::Double => quote!(f64),
    }
}

fn zero_literal(prim: PrimitiveType) -> TokenStream {
    match prim {
        PrimitiveType::Boolean => quote!(false),
        PrimitiveType::Int8 => quote!(0i8),
        PrimitiveType::UInt8 => quote!(0u8),
        PrimitiveType::Int16 => quote!(0i16),
        PrimitiveType::UInt16 => quote!(0u16),
        PrimitiveType::Int32 => quote!(0i32),
        PrimitiveType::UInt32 => quote!(0u32),
        PrimitiveType::Int64 => quote!(0i64),
        PrimitiveType::UInt64 => quote!(0u64),
        PrimitiveType::Single => quote!(0.0f32),
        PrimitiveType::Double => quote!(0.0f64),
    }
}

fn render(tokens: TokenStream) -> Result<String> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|e| EmitError::Syntax(e.to_string()))?;
    Ok(prettyplease::unparse(&file))
}
