//! Postgres native types.

use crate::error::{Error, Result};
use crate::schema::NativeType;

/// Largest length Postgres accepts for character and bit types.
pub const MAX_LENGTH: i64 = 10_485_760;

/// Largest numeric precision and scale accepted in declarations.
pub const MAX_NUMERIC_PRECISION: i64 = 1000;

/// Largest fractional-seconds precision of the time family.
pub const MAX_TIME_PRECISION: i64 = 6;

/// A parsed Postgres type with typed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostgresType {
    SmallInt,
    Integer,
    BigInt,
    /// `NUMERIC(precision, scale)`; scale is only present with a precision.
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Real,
    DoublePrecision,
    Money,
    Char(Option<u32>),
    VarChar(Option<u32>),
    Text,
    CiText,
    Boolean,
    Bit(Option<u32>),
    VarBit(Option<u32>),
    Uuid,
    Date,
    Time(Option<u32>),
    TimeTz(Option<u32>),
    Timestamp(Option<u32>),
    TimestampTz(Option<u32>),
    Interval(Option<u32>),
    Json,
    JsonB,
    Xml,
    ByteA,
    Inet,
    Cidr,
    MacAddr,
}

impl PostgresType {
    /// Parse a type name (any common alias, case-insensitive) with arguments.
    ///
    /// Returns `Ok(None)` when the name is not a known Postgres type.
    pub fn parse(name: &str, args: &[i64]) -> Result<Option<Self>> {
        let canonical = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let ty = match canonical.to_ascii_lowercase().as_str() {
            "smallint" | "int2" => no_args(name, args, PostgresType::SmallInt)?,
            "integer" | "int" | "int4" => no_args(name, args, PostgresType::Integer)?,
            "bigint" | "int8" => no_args(name, args, PostgresType::BigInt)?,
            "numeric" | "decimal" => numeric(name, args)?,
            "real" | "float4" => no_args(name, args, PostgresType::Real)?,
            "double precision" | "float8" | "float" => {
                no_args(name, args, PostgresType::DoublePrecision)?
            }
            "money" => no_args(name, args, PostgresType::Money)?,
            "char" | "character" | "bpchar" => PostgresType::Char(length(name, args)?),
            "varchar" | "character varying" => PostgresType::VarChar(length(name, args)?),
            "text" => no_args(name, args, PostgresType::Text)?,
            "citext" => no_args(name, args, PostgresType::CiText)?,
            "boolean" | "bool" => no_args(name, args, PostgresType::Boolean)?,
            "bit" => PostgresType::Bit(length(name, args)?),
            "varbit" | "bit varying" => PostgresType::VarBit(length(name, args)?),
            "uuid" => no_args(name, args, PostgresType::Uuid)?,
            "date" => no_args(name, args, PostgresType::Date)?,
            "time" | "time without time zone" => PostgresType::Time(precision(name, args)?),
            "timetz" | "time with time zone" => PostgresType::TimeTz(precision(name, args)?),
            "timestamp" | "timestamp without time zone" => {
                PostgresType::Timestamp(precision(name, args)?)
            }
            "timestamptz" | "timestamp with time zone" => {
                PostgresType::TimestampTz(precision(name, args)?)
            }
            "interval" => PostgresType::Interval(precision(name, args)?),
            "json" => no_args(name, args, PostgresType::Json)?,
            "jsonb" => no_args(name, args, PostgresType::JsonB)?,
            "xml" => no_args(name, args, PostgresType::Xml)?,
            "bytea" => no_args(name, args, PostgresType::ByteA)?,
            "inet" => no_args(name, args, PostgresType::Inet)?,
            "cidr" => no_args(name, args, PostgresType::Cidr)?,
            "macaddr" => no_args(name, args, PostgresType::MacAddr)?,
            _ => return Ok(None),
        };
        Ok(Some(ty))
    }

    /// Interpret a stored native type.
    pub fn from_native(native: &NativeType) -> Result<Option<Self>> {
        let args: Vec<i64> = native.args.iter().map(|&a| i64::from(a)).collect();
        Self::parse(&native.name, &args)
    }

    /// Canonical lower-case name, as stored in [`NativeType::name`].
    pub fn name(&self) -> &'static str {
        match self {
            PostgresType::SmallInt => "smallint",
            PostgresType::Integer => "integer",
            PostgresType::BigInt => "bigint",
            PostgresType::Numeric { .. } => "numeric",
            PostgresType::Real => "real",
            PostgresType::DoublePrecision => "double precision",
            PostgresType::Money => "money",
            PostgresType::Char(_) => "char",
            PostgresType::VarChar(_) => "varchar",
            PostgresType::Text => "text",
            PostgresType::CiText => "citext",
            PostgresType::Boolean => "boolean",
            PostgresType::Bit(_) => "bit",
            PostgresType::VarBit(_) => "varbit",
            PostgresType::Uuid => "uuid",
            PostgresType::Date => "date",
            PostgresType::Time(_) => "time",
            PostgresType::TimeTz(_) => "timetz",
            PostgresType::Timestamp(_) => "timestamp",
            PostgresType::TimestampTz(_) => "timestamptz",
            PostgresType::Interval(_) => "interval",
            PostgresType::Json => "json",
            PostgresType::JsonB => "jsonb",
            PostgresType::Xml => "xml",
            PostgresType::ByteA => "bytea",
            PostgresType::Inet => "inet",
            PostgresType::Cidr => "cidr",
            PostgresType::MacAddr => "macaddr",
        }
    }

    /// Numeric arguments in declaration order.
    pub fn args(&self) -> Vec<u32> {
        match *self {
            PostgresType::Numeric {
                precision: Some(p),
                scale: Some(s),
            } => vec![p, s],
            PostgresType::Numeric {
                precision: Some(p),
                scale: None,
            } => vec![p],
            PostgresType::Char(Some(n))
            | PostgresType::VarChar(Some(n))
            | PostgresType::Bit(Some(n))
            | PostgresType::VarBit(Some(n))
            | PostgresType::Time(Some(n))
            | PostgresType::TimeTz(Some(n))
            | PostgresType::Timestamp(Some(n))
            | PostgresType::TimestampTz(Some(n))
            | PostgresType::Interval(Some(n)) => vec![n],
            _ => Vec::new(),
        }
    }

    /// Convert into the schema model's native type.
    pub fn to_native(&self) -> NativeType {
        NativeType::with_args(self.name(), self.args())
    }

    /// The same type with defaulted arguments removed, so that `TIMESTAMP` and
    /// `TIMESTAMP(6)` compare equal. An unsized `CHAR` or `BIT` has length 1.
    pub fn normalized(self) -> Self {
        let default = Some(MAX_TIME_PRECISION as u32);
        match self {
            PostgresType::Char(Some(1)) => PostgresType::Char(None),
            PostgresType::Bit(Some(1)) => PostgresType::Bit(None),
            PostgresType::Time(p) if p == default => PostgresType::Time(None),
            PostgresType::TimeTz(p) if p == default => PostgresType::TimeTz(None),
            PostgresType::Timestamp(p) if p == default => PostgresType::Timestamp(None),
            PostgresType::TimestampTz(p) if p == default => PostgresType::TimestampTz(None),
            PostgresType::Interval(p) if p == default => PostgresType::Interval(None),
            PostgresType::Numeric {
                precision: Some(p),
                scale: Some(0),
            } => PostgresType::Numeric {
                precision: Some(p),
                scale: None,
            },
            other => other,
        }
    }
}

impl std::fmt::Display for PostgresType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PostgresType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            other => other.name().to_ascii_uppercase(),
        };
        f.write_str(&name)?;
        let args = self.args();
        if !args.is_empty() {
            let args: Vec<String> = args.iter().map(u32::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

fn no_args(name: &str, args: &[i64], ty: PostgresType) -> Result<PostgresType> {
    if args.is_empty() {
        Ok(ty)
    } else {
        Err(Error::invalid_argument(
            name,
            format!("expected no arguments, got {}", args.len()),
        ))
    }
}

fn length(name: &str, args: &[i64]) -> Result<Option<u32>> {
    match args {
        [] => Ok(None),
        [n] if (1..=MAX_LENGTH).contains(n) => Ok(Some(*n as u32)),
        [n] => Err(Error::invalid_argument(
            name,
            format!("length must be between 1 and {MAX_LENGTH}, got {n}"),
        )),
        _ => Err(Error::invalid_argument(
            name,
            format!("expected at most 1 argument, got {}", args.len()),
        )),
    }
}

fn precision(name: &str, args: &[i64]) -> Result<Option<u32>> {
    match args {
        [] => Ok(None),
        [p] if (0..=MAX_TIME_PRECISION).contains(p) => Ok(Some(*p as u32)),
        [p] => Err(Error::invalid_argument(
            name,
            format!("precision must be between 0 and {MAX_TIME_PRECISION}, got {p}"),
        )),
        _ => Err(Error::invalid_argument(
            name,
            format!("expected at most 1 argument, got {}", args.len()),
        )),
    }
}

fn numeric(name: &str, args: &[i64]) -> Result<PostgresType> {
    let check_precision = |p: i64| {
        if (1..=MAX_NUMERIC_PRECISION).contains(&p) {
            Ok(p as u32)
        } else {
            Err(Error::invalid_argument(
                name,
                format!("precision must be between 1 and {MAX_NUMERIC_PRECISION}, got {p}"),
            ))
        }
    };
    let check_scale = |s: i64| {
        if (0..=MAX_NUMERIC_PRECISION).contains(&s) {
            Ok(s as u32)
        } else {
            Err(Error::invalid_argument(
                name,
                format!("scale must be between 0 and {MAX_NUMERIC_PRECISION}, got {s}"),
            ))
        }
    };
    match args {
        [] => Ok(PostgresType::Numeric {
            precision: None,
            scale: None,
        }),
        [p] => Ok(PostgresType::Numeric {
            precision: Some(check_precision(*p)?),
            scale: None,
        }),
        [p, s] => Ok(PostgresType::Numeric {
            precision: Some(check_precision(*p)?),
            scale: Some(check_scale(*s)?),
        }),
        _ => Err(Error::invalid_argument(
            name,
            format!("expected at most 2 arguments, got {}", args.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(PostgresType::parse("int4", &[]).unwrap(), Some(PostgresType::Integer));
        assert_eq!(
            PostgresType::parse("character  varying", &[20]).unwrap(),
            Some(PostgresType::VarChar(Some(20)))
        );
        assert_eq!(
            PostgresType::parse("TIMESTAMP WITH TIME ZONE", &[3]).unwrap(),
            Some(PostgresType::TimestampTz(Some(3)))
        );
        assert_eq!(PostgresType::parse("bpchar", &[]).unwrap(), Some(PostgresType::Char(None)));
    }

    #[test]
    fn test_parse_unknown_is_not_an_error() {
        assert_eq!(PostgresType::parse("geometry", &[4326]).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(PostgresType::parse("numeric", &[0]).is_err());
        assert!(PostgresType::parse("numeric", &[1001]).is_err());
        assert!(PostgresType::parse("numeric", &[10, 1001]).is_err());
        assert!(PostgresType::parse("numeric", &[10, 2, 1]).is_err());
        assert!(PostgresType::parse("varchar", &[0]).is_err());
        assert!(PostgresType::parse("char", &[-1]).is_err());
        assert!(PostgresType::parse("timestamp", &[7]).is_err());
        assert!(PostgresType::parse("integer", &[4]).is_err());
        assert!(PostgresType::parse("numeric", &[1000, 1000]).is_ok());
        assert!(PostgresType::parse("time", &[0]).is_ok());
    }

    #[test]
    fn test_render() {
        let numeric = PostgresType::parse("decimal", &[10, 2]).unwrap().unwrap();
        assert_eq!(numeric.to_string(), "NUMERIC(10,2)");
        assert_eq!(PostgresType::DoublePrecision.to_string(), "DOUBLE PRECISION");
        assert_eq!(PostgresType::VarChar(Some(255)).to_string(), "VARCHAR(255)");
        assert_eq!(PostgresType::Timestamp(Some(3)).to_string(), "TIMESTAMP(3)");
        assert_eq!(PostgresType::Text.to_string(), "TEXT");
    }

    #[test]
    fn test_native_round_trip_and_normalize() {
        let ty = PostgresType::Numeric {
            precision: Some(12),
            scale: Some(4),
        };
        assert_eq!(PostgresType::from_native(&ty.to_native()).unwrap(), Some(ty));
        assert_eq!(
            PostgresType::Timestamp(Some(6)).normalized(),
            PostgresType::Timestamp(None)
        );
        assert_eq!(PostgresType::Char(Some(1)).normalized(), PostgresType::Char(None));
        assert_eq!(PostgresType::Bit(Some(1)).normalized(), PostgresType::Bit(None));
        assert_eq!(PostgresType::Bit(Some(8)).normalized(), PostgresType::Bit(Some(8)));
    }
}
