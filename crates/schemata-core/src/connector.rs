//! Dialect connector abstraction.
//!
//! A connector supplies everything dialect-specific that the differ needs:
//! native type parsing, scalar type mapping, and the type-cast risk classifier.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{ColumnTypeFamily, ColumnWalker, NativeType, Pair, ScalarType};

/// Risk of changing a column's type in place.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ColumnTypeChange {
    /// The types are identical.
    #[default]
    None,
    /// The cast always succeeds.
    SafeCast,
    /// The cast may fail depending on the stored data.
    RiskyCast,
    /// The column has to be dropped and recreated.
    NotCastable,
}

impl ColumnTypeChange {
    /// Whether the type changed at all.
    pub fn is_change(self) -> bool {
        self != ColumnTypeChange::None
    }
}

impl std::fmt::Display for ColumnTypeChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ColumnTypeChange::None => "none",
            ColumnTypeChange::SafeCast => "safe cast",
            ColumnTypeChange::RiskyCast => "risky cast",
            ColumnTypeChange::NotCastable => "not castable",
        };
        f.write_str(text)
    }
}

/// Capabilities a SQL dialect provides to the differ and planner.
pub trait Connector: Send + Sync {
    /// Dialect name.
    fn name(&self) -> &'static str;

    /// Longest identifier the dialect accepts.
    fn max_identifier_length(&self) -> usize;

    /// The portable scalar a native type maps to, if any.
    fn scalar_type_for_native_type(&self, native: &NativeType) -> Option<ScalarType>;

    /// The native type used for a portable scalar.
    fn default_native_type_for_scalar(&self, scalar: ScalarType) -> NativeType;

    /// Parse and validate a native type.
    ///
    /// Unknown names yield [`ColumnTypeFamily::Unsupported`]; only bad argument
    /// counts or out-of-range arguments are errors.
    fn parse_native_type(&self, name: &str, args: &[i64]) -> Result<ColumnTypeFamily>;

    /// Classify the type change between two matched columns.
    fn column_type_change(&self, columns: Pair<ColumnWalker<'_>>) -> ColumnTypeChange;
}
