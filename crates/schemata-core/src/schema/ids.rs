//! Arena identifiers for schema entities.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position of the entity in its owning collection.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a table within a [`Database`](super::Database).
    TableId
);
entity_id!(
    /// Identifies a column within a [`Database`](super::Database).
    ColumnId
);
entity_id!(
    /// Identifies an enum type within a [`Database`](super::Database).
    EnumId
);
entity_id!(
    /// Identifies an index (primary key, unique, or normal).
    IndexId
);
entity_id!(
    /// Identifies one column entry of an index.
    IndexColumnId
);
entity_id!(
    /// Identifies a foreign key constraint.
    ForeignKeyId
);
entity_id!(
    /// Identifies one column mapping of a foreign key.
    ForeignKeyColumnId
);
entity_id!(
    /// Identifies an installed extension.
    ExtensionId
);
