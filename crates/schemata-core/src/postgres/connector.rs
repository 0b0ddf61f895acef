//! The Postgres dialect connector.

use crate::connector::{ColumnTypeChange, Connector};
use crate::error::Result;
use crate::schema::{ColumnTypeFamily, ColumnWalker, NativeType, Pair, ScalarType};

use super::cast;
use super::types::PostgresType;

/// Postgres limits identifiers to `NAMEDATALEN - 1` bytes.
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Postgres implementation of [`Connector`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    /// Create the connector.
    pub fn new() -> Self {
        Self
    }

    /// The Postgres type used for a portable scalar.
    pub fn postgres_type_for_scalar(&self, scalar: ScalarType) -> PostgresType {
        match scalar {
            ScalarType::Int => PostgresType::Integer,
            ScalarType::BigInt => PostgresType::BigInt,
            ScalarType::Float => PostgresType::DoublePrecision,
            ScalarType::Decimal => PostgresType::Numeric {
                precision: Some(65),
                scale: Some(30),
            },
            ScalarType::String => PostgresType::Text,
            ScalarType::Bool => PostgresType::Boolean,
            ScalarType::Date => PostgresType::Date,
            ScalarType::DateTime => PostgresType::Timestamp(Some(3)),
            ScalarType::Time => PostgresType::Time(Some(3)),
            ScalarType::Bytes => PostgresType::ByteA,
        }
    }

    /// The portable scalar a Postgres type maps to.
    pub fn scalar_for_postgres_type(&self, ty: PostgresType) -> ScalarType {
        use PostgresType as T;
        match ty {
            T::SmallInt | T::Integer => ScalarType::Int,
            T::BigInt => ScalarType::BigInt,
            T::Real | T::DoublePrecision => ScalarType::Float,
            T::Numeric { .. } | T::Money => ScalarType::Decimal,
            T::Boolean => ScalarType::Bool,
            T::Date => ScalarType::Date,
            T::Timestamp(_) | T::TimestampTz(_) => ScalarType::DateTime,
            T::Time(_) | T::TimeTz(_) => ScalarType::Time,
            T::ByteA => ScalarType::Bytes,
            T::Char(_)
            | T::VarChar(_)
            | T::Text
            | T::CiText
            | T::Bit(_)
            | T::VarBit(_)
            | T::Uuid
            | T::Interval(_)
            | T::Json
            | T::JsonB
            | T::Xml
            | T::Inet
            | T::Cidr
            | T::MacAddr => ScalarType::String,
        }
    }
}

impl Connector for PostgresConnector {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn max_identifier_length(&self) -> usize {
        MAX_IDENTIFIER_LENGTH
    }

    fn scalar_type_for_native_type(&self, native: &NativeType) -> Option<ScalarType> {
        PostgresType::from_native(native)
            .ok()
            .flatten()
            .map(|ty| self.scalar_for_postgres_type(ty))
    }

    fn default_native_type_for_scalar(&self, scalar: ScalarType) -> NativeType {
        self.postgres_type_for_scalar(scalar).to_native()
    }

    fn parse_native_type(&self, name: &str, args: &[i64]) -> Result<ColumnTypeFamily> {
        Ok(match PostgresType::parse(name, args)? {
            Some(ty) => ColumnTypeFamily::Native(ty.to_native()),
            None => ColumnTypeFamily::Unsupported(name.to_string()),
        })
    }

    fn column_type_change(&self, columns: Pair<ColumnWalker<'_>>) -> ColumnTypeChange {
        cast::column_type_change(self, columns)
    }
}
