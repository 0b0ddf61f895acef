//! Type-cast risk classification for Postgres.
//!
//! Decides how dangerous it is to change a column from one type to another
//! with `ALTER COLUMN .. SET DATA TYPE`. The bounds below come from the
//! longest text rendering or the number of decimal digits of each source
//! type.

use crate::connector::ColumnTypeChange::{self, NotCastable, RiskyCast, SafeCast};
use crate::schema::{ColumnTypeFamily, ColumnWalker, Pair};

use super::connector::PostgresConnector;
use super::types::PostgresType;

/// Unbounded text rendering.
const UNBOUNDED: u32 = u32::MAX;

/// Classify a change between two matched columns.
pub(crate) fn column_type_change(
    connector: &PostgresConnector,
    columns: Pair<ColumnWalker<'_>>,
) -> ColumnTypeChange {
    match (columns.prev.enum_type(), columns.next.enum_type()) {
        (Some(prev), Some(next)) if prev.name() == next.name() => {
            return if columns.prev.is_list() == columns.next.is_list() {
                ColumnTypeChange::None
            } else {
                NotCastable
            };
        }
        (Some(_), Some(_)) => return NotCastable,
        (Some(_), None) | (None, Some(_)) => return NotCastable,
        (None, None) => {}
    }

    let from_list_to_scalar = columns.prev.is_list() && !columns.next.is_list();
    let from_scalar_to_list = !columns.prev.is_list() && columns.next.is_list();
    let prev = resolve(connector, columns.prev);
    let next = resolve(connector, columns.next);

    if from_list_to_scalar {
        return match next {
            Some(PostgresType::Text) | Some(PostgresType::VarChar(None)) => SafeCast,
            Some(PostgresType::VarChar(Some(_))) | Some(PostgresType::Char(Some(_))) => RiskyCast,
            _ => NotCastable,
        };
    }
    if from_scalar_to_list {
        return NotCastable;
    }

    match (prev, next) {
        (Some(prev), Some(next)) => riskiness(prev, next),
        _ if columns.prev.column_type().raw == columns.next.column_type().raw => {
            ColumnTypeChange::None
        }
        _ => RiskyCast,
    }
}

/// The Postgres type a column stores, or `None` for unsupported types.
fn resolve(connector: &PostgresConnector, column: ColumnWalker<'_>) -> Option<PostgresType> {
    match &column.column_type().family {
        ColumnTypeFamily::Scalar(scalar) => Some(connector.postgres_type_for_scalar(*scalar)),
        ColumnTypeFamily::Native(native) => PostgresType::from_native(native).ok().flatten(),
        ColumnTypeFamily::Enum(_) | ColumnTypeFamily::Unsupported(_) => None,
    }
}

/// Classify a change between two native types.
pub fn riskiness(prev: PostgresType, next: PostgresType) -> ColumnTypeChange {
    use PostgresType as T;

    if prev.normalized() == next.normalized() {
        return ColumnTypeChange::None;
    }

    match prev {
        T::Inet | T::Cidr | T::MacAddr => match next {
            T::Inet if prev == T::Cidr => SafeCast,
            _ => to_string_type(next, 43).unwrap_or(NotCastable),
        },

        T::Money => match next {
            T::Numeric { .. } => RiskyCast,
            _ => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),
        },

        T::CiText => to_string_type(next, UNBOUNDED).unwrap_or(RiskyCast),

        T::SmallInt => match next {
            T::Integer | T::BigInt | T::Real | T::DoublePrecision => SafeCast,
            T::Numeric { .. } => numeric_holds_digits(next, 5),
            _ => to_string_type(next, 6).unwrap_or(NotCastable),
        },

        T::Integer => match next {
            T::SmallInt => RiskyCast,
            T::BigInt | T::Real | T::DoublePrecision => SafeCast,
            T::Numeric { .. } => numeric_holds_digits(next, 10),
            _ => to_string_type(next, 11).unwrap_or(NotCastable),
        },

        T::BigInt => match next {
            T::SmallInt | T::Integer => RiskyCast,
            T::Real | T::DoublePrecision => SafeCast,
            T::Numeric { .. } => numeric_holds_digits(next, 19),
            _ => to_string_type(next, 20).unwrap_or(NotCastable),
        },

        T::Numeric { precision, scale } => {
            let scale = scale.unwrap_or(0);
            match next {
                T::SmallInt => numeric_fits_integer(precision, scale, 4),
                T::Integer => numeric_fits_integer(precision, scale, 9),
                T::BigInt => numeric_fits_integer(precision, scale, 18),
                T::Numeric {
                    precision: next_precision,
                    scale: next_scale,
                } => match (precision, next_precision) {
                    (_, None) => SafeCast,
                    (None, Some(_)) => RiskyCast,
                    (Some(p), Some(np)) => {
                        let ns = next_scale.unwrap_or(0);
                        if np.saturating_sub(ns) >= p.saturating_sub(scale) && ns >= scale {
                            SafeCast
                        } else {
                            RiskyCast
                        }
                    }
                },
                T::Real | T::DoublePrecision => RiskyCast,
                _ => {
                    let max_len = match precision {
                        Some(p) => p + 1 + u32::from(scale > 0),
                        None => UNBOUNDED,
                    };
                    to_string_type(next, max_len).unwrap_or(NotCastable)
                }
            }
        }

        T::Real => match next {
            T::SmallInt | T::Integer | T::BigInt | T::Numeric { .. } => RiskyCast,
            T::DoublePrecision => SafeCast,
            _ => to_string_type(next, 47).unwrap_or(NotCastable),
        },

        T::DoublePrecision => match next {
            T::SmallInt | T::Integer | T::BigInt | T::Numeric { .. } | T::Real => RiskyCast,
            _ => to_string_type(next, 317).unwrap_or(NotCastable),
        },

        T::VarChar(length) => {
            to_string_type(next, length.unwrap_or(UNBOUNDED)).unwrap_or(NotCastable)
        }

        // An unsized CHAR holds exactly one character.
        T::Char(length) => to_string_type(next, length.unwrap_or(1)).unwrap_or(NotCastable),

        T::Text => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),

        T::ByteA => match next {
            T::VarChar(Some(n)) | T::Char(Some(n)) if n > 2 => RiskyCast,
            T::Text | T::VarChar(None) => SafeCast,
            _ => NotCastable,
        },

        T::Timestamp(_) => match next {
            T::Timestamp(_) | T::TimestampTz(_) | T::Date | T::Time(_) | T::TimeTz(_) => {
                SafeCast
            }
            _ => to_string_type(next, 23).unwrap_or(NotCastable),
        },

        T::TimestampTz(_) => match next {
            T::TimestampTz(_) | T::Timestamp(_) | T::Date | T::Time(_) | T::TimeTz(_) => {
                SafeCast
            }
            _ => to_string_type(next, 28).unwrap_or(NotCastable),
        },

        T::Date => match next {
            T::Timestamp(_) | T::TimestampTz(_) => SafeCast,
            _ => to_string_type(next, 28).unwrap_or(NotCastable),
        },

        T::Time(_) => match next {
            T::Time(_) | T::TimeTz(_) => SafeCast,
            _ => to_string_type(next, 14).unwrap_or(NotCastable),
        },

        T::TimeTz(_) => match next {
            T::TimeTz(_) | T::Time(_) => SafeCast,
            _ => to_string_type(next, 19).unwrap_or(NotCastable),
        },

        T::Interval(_) => match next {
            T::Interval(_) => SafeCast,
            _ => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),
        },

        T::Boolean => to_string_type(next, 5).unwrap_or(NotCastable),

        // An unsized BIT holds exactly one bit.
        T::Bit(length) => {
            let length = length.unwrap_or(1);
            match next {
                T::VarBit(None) => SafeCast,
                T::VarBit(Some(n)) if n >= length => SafeCast,
                T::VarBit(Some(_)) => RiskyCast,
                _ => to_string_type(next, length).unwrap_or(NotCastable),
            }
        }

        T::VarBit(length) => {
            let length = length.unwrap_or(UNBOUNDED);
            match next {
                T::VarBit(None) => SafeCast,
                T::VarBit(Some(n)) if n >= length => SafeCast,
                T::VarBit(Some(_)) | T::Bit(_) => RiskyCast,
                _ => to_string_type(next, length).unwrap_or(NotCastable),
            }
        }

        T::Uuid => to_string_type(next, 36).unwrap_or(NotCastable),

        T::Xml => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),

        T::Json => match next {
            T::JsonB => SafeCast,
            _ => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),
        },

        T::JsonB => match next {
            T::Json => SafeCast,
            _ => to_string_type(next, UNBOUNDED).unwrap_or(NotCastable),
        },
    }
}

/// Casting to a string type whose text rendering needs up to `max_len`
/// characters. `None` when `next` is not a string type.
fn to_string_type(next: PostgresType, max_len: u32) -> Option<ColumnTypeChange> {
    let change = match next {
        PostgresType::Text | PostgresType::CiText | PostgresType::VarChar(None) => SafeCast,
        PostgresType::VarChar(Some(n)) | PostgresType::Char(Some(n)) => {
            if n >= max_len {
                SafeCast
            } else {
                RiskyCast
            }
        }
        PostgresType::Char(None) => {
            if max_len <= 1 {
                SafeCast
            } else {
                RiskyCast
            }
        }
        _ => return None,
    };
    Some(change)
}

/// Integer to numeric: the target needs `digits` places before the point.
fn numeric_holds_digits(next: PostgresType, digits: u32) -> ColumnTypeChange {
    match next {
        PostgresType::Numeric {
            precision: Some(p),
            scale,
        } if p.saturating_sub(scale.unwrap_or(0)) < digits => RiskyCast,
        _ => SafeCast,
    }
}

/// Numeric to integer: safe when there is no fraction and at most
/// `max_digits` digits, which always fit the integer's range.
fn numeric_fits_integer(precision: Option<u32>, scale: u32, max_digits: u32) -> ColumnTypeChange {
    match precision {
        Some(p) if p <= max_digits && scale == 0 => SafeCast,
        _ => RiskyCast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType, Database, Enum, NativeType, ScalarType, Table};
    use pretty_assertions::assert_eq;

    fn numeric(precision: u32, scale: u32) -> PostgresType {
        PostgresType::Numeric {
            precision: Some(precision),
            scale: Some(scale),
        }
    }

    #[test]
    fn test_literal_cases() {
        use PostgresType as T;
        assert_eq!(riskiness(T::SmallInt, T::Integer), SafeCast);
        assert_eq!(riskiness(T::Integer, T::SmallInt), RiskyCast);
        assert_eq!(riskiness(T::Text, T::Char(None)), RiskyCast);
        assert_eq!(
            riskiness(T::VarChar(Some(10)), T::VarChar(Some(10))),
            ColumnTypeChange::None
        );
        assert_eq!(riskiness(T::Integer, numeric(3, 0)), RiskyCast);
        assert_eq!(riskiness(T::Integer, numeric(12, 0)), SafeCast);
        assert_eq!(riskiness(T::Money, T::Inet), NotCastable);
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(riskiness(numeric(10, 2), numeric(12, 2)), SafeCast);
        assert_eq!(riskiness(numeric(10, 2), numeric(12, 4)), SafeCast);
        assert_eq!(riskiness(numeric(4, 0), numeric(4, 2)), RiskyCast);
        assert_eq!(riskiness(numeric(4, 2), numeric(4, 0)), RiskyCast);
        assert_eq!(
            riskiness(
                numeric(4, 2),
                PostgresType::Numeric {
                    precision: None,
                    scale: None
                }
            ),
            SafeCast
        );
    }

    #[test]
    fn test_string_lengths() {
        use PostgresType as T;
        assert_eq!(riskiness(T::VarChar(Some(20)), T::VarChar(Some(10))), RiskyCast);
        assert_eq!(riskiness(T::VarChar(Some(10)), T::VarChar(Some(20))), SafeCast);
        assert_eq!(riskiness(T::VarChar(None), T::VarChar(Some(20))), RiskyCast);
        assert_eq!(riskiness(T::Integer, T::VarChar(Some(11))), SafeCast);
        assert_eq!(riskiness(T::Integer, T::VarChar(Some(5))), RiskyCast);
        assert_eq!(riskiness(T::Integer, T::Text), SafeCast);
        assert_eq!(riskiness(T::Uuid, T::VarChar(Some(36))), SafeCast);
        assert_eq!(riskiness(T::Text, T::Integer), NotCastable);
    }

    #[test]
    fn test_time_family() {
        use PostgresType as T;
        assert_eq!(
            riskiness(T::Timestamp(Some(6)), T::Timestamp(None)),
            ColumnTypeChange::None
        );
        assert_eq!(riskiness(T::Timestamp(Some(3)), T::Timestamp(None)), SafeCast);
        assert_eq!(riskiness(T::Date, T::TimestampTz(None)), SafeCast);
        assert_eq!(riskiness(T::Date, T::Boolean), NotCastable);
    }

    #[test]
    fn test_unsized_char_and_bit_have_length_one() {
        use PostgresType as T;
        assert_eq!(riskiness(T::Char(Some(1)), T::Char(None)), ColumnTypeChange::None);
        assert_eq!(riskiness(T::Char(None), T::Char(Some(1))), ColumnTypeChange::None);
        assert_eq!(riskiness(T::Bit(Some(1)), T::Bit(None)), ColumnTypeChange::None);
        assert_eq!(riskiness(T::Bit(None), T::Bit(Some(1))), ColumnTypeChange::None);
        assert_eq!(riskiness(T::Char(Some(2)), T::Char(None)), RiskyCast);
        assert_eq!(riskiness(T::Char(None), T::Char(Some(4))), SafeCast);
    }

    fn enum_columns(prev_enum: &str, next_enum: &str) -> (Database, Database) {
        let build = |enum_name: &str| {
            let mut db = Database::new("public");
            let e = db.add_enum(Enum::new(enum_name, ["X", "Y"]));
            let t = db.add_table(Table::new("t"));
            db.add_column(Column::new(t, "c", ColumnType::enum_type(e)));
            db
        };
        (build(prev_enum), build(next_enum))
    }

    fn classify(prev: &Database, next: &Database) -> ColumnTypeChange {
        let columns = Pair::new(
            prev.walk_columns().next().unwrap(),
            next.walk_columns().next().unwrap(),
        );
        column_type_change(&PostgresConnector, columns)
    }

    #[test]
    fn test_enum_identity() {
        let (prev, next) = enum_columns("A", "A");
        assert_eq!(classify(&prev, &next), ColumnTypeChange::None);

        let (prev, next) = enum_columns("A", "B");
        assert_eq!(classify(&prev, &next), NotCastable);
    }

    fn single_column(ty: ColumnType) -> Database {
        let mut db = Database::new("public");
        let t = db.add_table(Table::new("t"));
        db.add_column(Column::new(t, "c", ty));
        db
    }

    #[test]
    fn test_arity_transitions() {
        let text = ColumnType::native(NativeType::new("text"));
        let prev = single_column(text.clone().list());
        let next = single_column(text.clone());
        assert_eq!(classify(&prev, &next), SafeCast);

        let prev = single_column(text.clone());
        let next = single_column(text.list());
        assert_eq!(classify(&prev, &next), NotCastable);

        let prev = single_column(ColumnType::scalar(ScalarType::Int).list());
        let next = single_column(ColumnType::scalar(ScalarType::Int));
        assert_eq!(classify(&prev, &next), NotCastable);
    }

    #[test]
    fn test_scalar_resolves_to_default_native_type() {
        let prev = single_column(ColumnType::native(NativeType::new("integer")));
        let next = single_column(ColumnType::scalar(ScalarType::Int));
        assert_eq!(classify(&prev, &next), ColumnTypeChange::None);

        let next = single_column(ColumnType::scalar(ScalarType::BigInt));
        assert_eq!(classify(&prev, &next), SafeCast);
    }

    #[test]
    fn test_unsupported_types_compare_raw_text() {
        let prev = single_column(ColumnType::new(
            ColumnTypeFamily::Unsupported("geometry".into()),
            Default::default(),
        ));
        let same = prev.clone();
        assert_eq!(classify(&prev, &same), ColumnTypeChange::None);

        let next = single_column(ColumnType::new(
            ColumnTypeFamily::Unsupported("geography".into()),
            Default::default(),
        ));
        assert_eq!(classify(&prev, &next), RiskyCast);
    }
}
