//! Semantic field types and the width table.
//!
//! | Label     | Rust type | Width |
//! |-----------|-----------|-------|
//! | boolean   | bool      | 1     |
//! | int8      | i8        | 1     |
//! | uint8     | u8        | 1     |
//! | int16     | i16       | 2     |
//! | uint16    | u16       | 2     |
//! | int32     | i32       | 4     |
//! | uint32    | u32       | 4     |
//! | int64     | i64       | 8     |
//! | uint64    | u64       | 8     |
//! | single    | f32       | 4     |
//! | double    | f64       | 8     |
//!
//! Enumerated types are written `Enum: <Name>` and take the width of their
//! storage primitive. An enumeration whose storage has not been resolved has
//! no width and is rejected by the layout planner.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of enumerated type labels.
pub const ENUM_PREFIX: &str = "Enum:";

/// Primitive semantic types with a fixed byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
}

impl PrimitiveType {
    /// All primitive types, in width-table order.
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Double,
        PrimitiveType::Int64,
        PrimitiveType::UInt64,
        PrimitiveType::Single,
        PrimitiveType::Int32,
        PrimitiveType::UInt32,
        PrimitiveType::Int16,
        PrimitiveType::UInt16,
        PrimitiveType::Int8,
        PrimitiveType::UInt8,
        PrimitiveType::Boolean,
    ];

    /// Width of one element in bytes.
    pub const fn width(self) -> usize {
        match self {
            PrimitiveType::Double | PrimitiveType::Int64 | PrimitiveType::UInt64 => 8,
            PrimitiveType::Single | PrimitiveType::Int32 | PrimitiveType::UInt32 => 4,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int8 | PrimitiveType::UInt8 | PrimitiveType::Boolean => 1,
        }
    }

    /// Label used in record documents and diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Int8 => "int8",
            PrimitiveType::UInt8 => "uint8",
            PrimitiveType::Int16 => "int16",
            PrimitiveType::UInt16 => "uint16",
            PrimitiveType::Int32 => "int32",
            PrimitiveType::UInt32 => "uint32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::UInt64 => "uint64",
            PrimitiveType::Single => "single",
            PrimitiveType::Double => "double",
        }
    }

    /// Whether this type can hold enumeration tags.
    pub const fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Boolean | PrimitiveType::Single | PrimitiveType::Double
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::ALL
            .into_iter()
            .find(|ty| ty.label() == s)
            .ok_or_else(|| format!("unknown primitive type {:?}", s))
    }
}

/// The semantic type of a field.
///
/// Serialized as its label, e.g. `"int16"` or `"Enum: Gear (uint8)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FieldType {
    /// A plain primitive
    Primitive(PrimitiveType),

    /// A tagged enumeration stored as an integer primitive
    Enumerated {
        name: String,
        storage: Option<PrimitiveType>,
    },
}

impl FieldType {
    /// The primitive the field is stored as, if known.
    pub fn storage(&self) -> Option<PrimitiveType> {
        match self {
            FieldType::Primitive(prim) => Some(*prim),
            FieldType::Enumerated { storage, .. } => *storage,
        }
    }

    pub fn is_enumerated(&self) -> bool {
        matches!(self, FieldType::Enumerated { .. })
    }
}

impl From<PrimitiveType> for FieldType {
    fn from(prim: PrimitiveType) -> Self {
        FieldType::Primitive(prim)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(prim) => write!(f, "{}", prim),
            FieldType::Enumerated {
                name,
                storage: Some(prim),
            } => write!(f, "{} {} ({})", ENUM_PREFIX, name, prim),
            FieldType::Enumerated {
                name,
                storage: None,
            } => write!(f, "{} {}", ENUM_PREFIX, name),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    /// Parse a type label.
    ///
    /// `Enum: Gear` parses with unresolved storage, `Enum: Gear (uint8)`
    /// with its storage primitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(rest) = s.strip_prefix(ENUM_PREFIX) else {
            return s.parse::<PrimitiveType>().map(FieldType::Primitive);
        };

        let rest = rest.trim();
        let (name, storage) = match rest.strip_suffix(')').and_then(|r| r.rsplit_once(" (")) {
            Some((name, storage)) => (name.trim(), Some(storage.parse::<PrimitiveType>()?)),
            None => (rest, None),
        };

        if name.is_empty() {
            return Err("enumeration label has no name".to_string());
        }
        Ok(FieldType::Enumerated {
            name: name.to_string(),
            storage,
        })
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

/// Look up the byte width of one element of `ty`.
///
/// Returns `None` for an enumeration without resolved storage.
pub fn type_width(ty: &FieldType) -> Option<usize> {
    ty.storage().map(PrimitiveType::width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_table() {
        assert_eq!(PrimitiveType::Double.width(), 8);
        assert_eq!(PrimitiveType::Int64.width(), 8);
        assert_eq!(PrimitiveType::UInt64.width(), 8);
        assert_eq!(PrimitiveType::Single.width(), 4);
        assert_eq!(PrimitiveType::Int32.width(), 4);
        assert_eq!(PrimitiveType::UInt32.width(), 4);
        assert_eq!(PrimitiveType::Int16.width(), 2);
        assert_eq!(PrimitiveType::UInt16.width(), 2);
        assert_eq!(PrimitiveType::Int8.width(), 1);
        assert_eq!(PrimitiveType::UInt8.width(), 1);
        assert_eq!(PrimitiveType::Boolean.width(), 1);
    }

    #[test]
    fn test_labels_parse_back() {
        for prim in PrimitiveType::ALL {
            assert_eq!(prim.label().parse::<PrimitiveType>().unwrap(), prim);
        }
        assert!("float".parse::<PrimitiveType>().is_err());
    }

    #[test]
    fn test_enum_label() {
        let ty: FieldType = "Enum: GearMode".parse().unwrap();
        assert_eq!(
            ty,
            FieldType::Enumerated {
                name: "GearMode".to_string(),
                storage: None
            }
        );
        assert_eq!(type_width(&ty), None);
        assert!("Enum:".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_enum_width_follows_storage() {
        let ty = FieldType::Enumerated {
            name: "GearMode".to_string(),
            storage: Some(PrimitiveType::Int16),
        };
        assert_eq!(type_width(&ty), Some(2));
        assert_eq!(ty.to_string(), "Enum: GearMode (int16)");
        assert_eq!(ty.to_string().parse::<FieldType>().unwrap(), ty);
    }

    #[test]
    fn test_serde_as_label() {
        let ty = FieldType::Primitive(PrimitiveType::UInt32);
        assert_eq!(serde_json::to_string(&ty).unwrap(), "\"uint32\"");

        let back: FieldType = serde_json::from_str("\"Enum: Mode (uint8)\"").unwrap();
        assert_eq!(back.storage(), Some(PrimitiveType::UInt8));
        assert!(serde_json::from_str::<FieldType>("\"float\"").is_err());
    }
}
