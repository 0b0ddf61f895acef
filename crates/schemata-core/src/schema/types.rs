//! Column type definitions.

use serde::{Deserialize, Serialize};

use super::ids::EnumId;

/// Portable scalar types understood by every dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// Double precision floating point.
    Float,
    /// Fixed-precision decimal.
    Decimal,
    /// Text.
    String,
    /// Boolean.
    Bool,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Time of day.
    Time,
    /// Binary data.
    Bytes,
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScalarType::Int => "Int",
            ScalarType::BigInt => "BigInt",
            ScalarType::Float => "Float",
            ScalarType::Decimal => "Decimal",
            ScalarType::String => "String",
            ScalarType::Bool => "Bool",
            ScalarType::Date => "Date",
            ScalarType::DateTime => "DateTime",
            ScalarType::Time => "Time",
            ScalarType::Bytes => "Bytes",
        };
        f.write_str(name)
    }
}

/// A dialect-specific type: a canonical type name plus its numeric arguments.
///
/// The dialect connector owns the interpretation of the name; the schema model
/// only stores it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeType {
    /// Canonical type name (e.g. `varchar`).
    pub name: String,
    /// Numeric arguments in declaration order (e.g. `[10, 2]`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<u32>,
}

impl NativeType {
    /// Create a native type without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Create a native type with arguments.
    pub fn with_args(name: impl Into<String>, args: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl std::fmt::Display for NativeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(u32::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

/// What kind of type a column has.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnTypeFamily {
    /// A portable scalar, mapped to the dialect's default native type.
    Scalar(ScalarType),
    /// A reference to an enum in the same database.
    Enum(EnumId),
    /// A dialect-native type.
    Native(NativeType),
    /// A type the dialect does not recognise, kept by its raw name.
    Unsupported(String),
}

/// Column cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColumnArity {
    /// NOT NULL scalar.
    #[default]
    Required,
    /// Nullable scalar.
    Nullable,
    /// Array.
    List,
}

/// The full type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    /// Resolved type family.
    pub family: ColumnTypeFamily,
    /// Type text as originally written or introspected.
    #[serde(default)]
    pub raw: String,
    /// Cardinality.
    #[serde(default)]
    pub arity: ColumnArity,
}

impl ColumnType {
    /// Create a column type with the given family and arity.
    pub fn new(family: ColumnTypeFamily, arity: ColumnArity) -> Self {
        let raw = match &family {
            ColumnTypeFamily::Scalar(scalar) => scalar.to_string(),
            ColumnTypeFamily::Enum(_) => String::new(),
            ColumnTypeFamily::Native(native) => native.to_string(),
            ColumnTypeFamily::Unsupported(name) => name.clone(),
        };
        Self { family, raw, arity }
    }

    /// A required scalar type.
    pub fn scalar(scalar: ScalarType) -> Self {
        Self::new(ColumnTypeFamily::Scalar(scalar), ColumnArity::Required)
    }

    /// A required native type.
    pub fn native(native: NativeType) -> Self {
        Self::new(ColumnTypeFamily::Native(native), ColumnArity::Required)
    }

    /// A required enum type.
    pub fn enum_type(id: EnumId) -> Self {
        Self::new(ColumnTypeFamily::Enum(id), ColumnArity::Required)
    }

    /// Replace the raw type text.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Make the type nullable.
    pub fn nullable(mut self) -> Self {
        self.arity = ColumnArity::Nullable;
        self
    }

    /// Make the type an array.
    pub fn list(mut self) -> Self {
        self.arity = ColumnArity::List;
        self
    }

    /// The referenced enum, if this is an enum type.
    pub fn enum_id(&self) -> Option<EnumId> {
        match self.family {
            ColumnTypeFamily::Enum(id) => Some(id),
            _ => None,
        }
    }
}
