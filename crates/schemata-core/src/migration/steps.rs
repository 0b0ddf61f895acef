//! Migration step types produced by the differ.

use serde::Serialize;

use crate::connector::ColumnTypeChange;
use crate::schema::{ColumnId, EnumId, ExtensionId, ForeignKeyId, IndexId, Pair, TableId};

/// One schema-level change.
///
/// IDs refer to the previous database for entities that only exist there
/// (drops) and to the next database otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MigrationStep {
    /// Drop an extension.
    DropExtension {
        /// Extension in the previous database.
        extension: ExtensionId,
    },
    /// Create an extension.
    CreateExtension {
        /// Extension in the next database.
        extension: ExtensionId,
    },
    /// Change an extension's version or schema.
    AlterExtension {
        /// The matched extensions.
        extensions: Pair<ExtensionId>,
        /// What changed.
        changes: ExtensionChanges,
    },
    /// Create an enum type.
    CreateEnum {
        /// Enum in the next database.
        enum_id: EnumId,
    },
    /// Add or remove enum variants.
    AlterEnum {
        /// The matched enums.
        enums: Pair<EnumId>,
        /// Variants only present in the next enum.
        created_variants: Vec<String>,
        /// Variants only present in the previous enum.
        dropped_variants: Vec<String>,
    },
    /// Drop a foreign key.
    DropForeignKey {
        /// Foreign key in the previous database.
        foreign_key: ForeignKeyId,
    },
    /// Drop an index.
    DropIndex {
        /// Index in the previous database.
        index: IndexId,
    },
    /// Apply column and constraint changes to a table.
    AlterTable {
        /// The matched tables.
        tables: Pair<TableId>,
        /// Ordered changes.
        changes: Vec<TableChange>,
    },
    /// Drop a table.
    DropTable {
        /// Table in the previous database.
        table: TableId,
    },
    /// Drop an enum type.
    DropEnum {
        /// Enum in the previous database.
        enum_id: EnumId,
    },
    /// Create a table with its primary key.
    CreateTable {
        /// Table in the next database.
        table: TableId,
    },
    /// Create an index.
    CreateIndex {
        /// Index in the next database.
        index: IndexId,
    },
    /// Rename a foreign key constraint.
    RenameForeignKey {
        /// The matched foreign keys.
        foreign_keys: Pair<ForeignKeyId>,
    },
    /// Add a foreign key.
    AddForeignKey {
        /// Foreign key in the next database.
        foreign_key: ForeignKeyId,
    },
    /// Rename an index.
    RenameIndex {
        /// The matched indexes.
        indexes: Pair<IndexId>,
    },
}

impl MigrationStep {
    /// Execution precedence: lower runs first.
    ///
    /// Foreign keys and indexes go before the tables they depend on are
    /// altered or dropped. Tables are dropped before enums, and enums are
    /// altered before tables. Indexes are created after table alterations and
    /// foreign keys after the unique indexes they may rely on.
    pub fn precedence(&self) -> u8 {
        match self {
            MigrationStep::DropExtension { .. } => 0,
            MigrationStep::CreateExtension { .. } => 1,
            MigrationStep::AlterExtension { .. } => 2,
            MigrationStep::CreateEnum { .. } => 3,
            MigrationStep::AlterEnum { .. } => 4,
            MigrationStep::DropForeignKey { .. } => 5,
            MigrationStep::DropIndex { .. } => 6,
            MigrationStep::AlterTable { .. } => 7,
            MigrationStep::DropTable { .. } => 8,
            MigrationStep::DropEnum { .. } => 9,
            MigrationStep::CreateTable { .. } => 10,
            MigrationStep::CreateIndex { .. } => 11,
            MigrationStep::RenameForeignKey { .. } => 12,
            MigrationStep::AddForeignKey { .. } => 13,
            MigrationStep::RenameIndex { .. } => 14,
        }
    }

    /// ID of the step's primary entity: next-side when the entity exists
    /// there, previous-side otherwise.
    pub fn primary_id(&self) -> usize {
        match self {
            MigrationStep::DropExtension { extension } => extension.index(),
            MigrationStep::CreateExtension { extension } => extension.index(),
            MigrationStep::AlterExtension { extensions, .. } => extensions.next.index(),
            MigrationStep::CreateEnum { enum_id } => enum_id.index(),
            MigrationStep::AlterEnum { enums, .. } => enums.next.index(),
            MigrationStep::DropForeignKey { foreign_key } => foreign_key.index(),
            MigrationStep::DropIndex { index } => index.index(),
            MigrationStep::AlterTable { tables, .. } => tables.next.index(),
            MigrationStep::DropTable { table } => table.index(),
            MigrationStep::DropEnum { enum_id } => enum_id.index(),
            MigrationStep::CreateTable { table } => table.index(),
            MigrationStep::CreateIndex { index } => index.index(),
            MigrationStep::RenameForeignKey { foreign_keys } => foreign_keys.next.index(),
            MigrationStep::AddForeignKey { foreign_key } => foreign_key.index(),
            MigrationStep::RenameIndex { indexes } => indexes.next.index(),
        }
    }

    /// Key the differ sorts by.
    pub fn sort_key(&self) -> (u8, usize) {
        (self.precedence(), self.primary_id())
    }

    /// Short name of the step kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationStep::DropExtension { .. } => "DropExtension",
            MigrationStep::CreateExtension { .. } => "CreateExtension",
            MigrationStep::AlterExtension { .. } => "AlterExtension",
            MigrationStep::CreateEnum { .. } => "CreateEnum",
            MigrationStep::AlterEnum { .. } => "AlterEnum",
            MigrationStep::DropForeignKey { .. } => "DropForeignKey",
            MigrationStep::DropIndex { .. } => "DropIndex",
            MigrationStep::AlterTable { .. } => "AlterTable",
            MigrationStep::DropTable { .. } => "DropTable",
            MigrationStep::DropEnum { .. } => "DropEnum",
            MigrationStep::CreateTable { .. } => "CreateTable",
            MigrationStep::CreateIndex { .. } => "CreateIndex",
            MigrationStep::RenameForeignKey { .. } => "RenameForeignKey",
            MigrationStep::AddForeignKey { .. } => "AddForeignKey",
            MigrationStep::RenameIndex { .. } => "RenameIndex",
        }
    }
}

/// One column- or constraint-level change inside an `AlterTable` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableChange {
    /// Drop the previous primary key.
    DropPrimaryKey,
    /// Rename the primary key constraint.
    RenamePrimaryKey,
    /// Drop a column of the previous table.
    DropColumn {
        /// Column in the previous database.
        column: ColumnId,
    },
    /// Add a column of the next table.
    AddColumn {
        /// Column in the next database.
        column: ColumnId,
    },
    /// Alter a column in place.
    AlterColumn {
        /// The matched columns.
        columns: Pair<ColumnId>,
        /// What changed, including the type-change classification.
        changes: ColumnChanges,
    },
    /// Replace a column whose type cannot be cast.
    DropAndRecreateColumn {
        /// The matched columns.
        columns: Pair<ColumnId>,
        /// What changed.
        changes: ColumnChanges,
    },
    /// Add the next primary key.
    AddPrimaryKey,
}

/// Bitmask of differences between two matched columns, plus the type-change
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ColumnChanges {
    type_change: ColumnTypeChange,
    bits: u8,
}

impl ColumnChanges {
    const DEFAULT: u8 = 1 << 0;
    const ARITY: u8 = 1 << 1;
    const TYPE: u8 = 1 << 2;
    const AUTO_INCREMENT: u8 = 1 << 3;

    /// Build from individual flags. The type bit is set iff `type_change` is
    /// not [`ColumnTypeChange::None`].
    pub fn new(
        type_change: ColumnTypeChange,
        default_changed: bool,
        arity_changed: bool,
        auto_increment_changed: bool,
    ) -> Self {
        let mut bits = 0;
        if default_changed {
            bits |= Self::DEFAULT;
        }
        if arity_changed {
            bits |= Self::ARITY;
        }
        if type_change.is_change() {
            bits |= Self::TYPE;
        }
        if auto_increment_changed {
            bits |= Self::AUTO_INCREMENT;
        }
        Self { type_change, bits }
    }

    /// Whether any flag is set.
    pub fn differs_in_something(&self) -> bool {
        self.bits != 0
    }

    /// Whether the default changed.
    pub fn default_changed(&self) -> bool {
        self.bits & Self::DEFAULT != 0
    }

    /// Whether the arity changed.
    pub fn arity_changed(&self) -> bool {
        self.bits & Self::ARITY != 0
    }

    /// Whether the type changed.
    pub fn type_changed(&self) -> bool {
        self.bits & Self::TYPE != 0
    }

    /// Whether auto-increment was switched on or off.
    pub fn auto_increment_changed(&self) -> bool {
        self.bits & Self::AUTO_INCREMENT != 0
    }

    /// Classification of the type change.
    pub fn type_change(&self) -> ColumnTypeChange {
        self.type_change
    }

    /// Whether the column has to be dropped and recreated.
    pub fn requires_recreate(&self) -> bool {
        self.type_change == ColumnTypeChange::NotCastable
    }
}

/// What changed on a matched extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExtensionChanges {
    /// The pinned version differs.
    pub version: bool,
    /// The pinned schema differs.
    pub schema: bool,
}

impl ExtensionChanges {
    /// Whether anything changed.
    pub fn is_empty(&self) -> bool {
        !self.version && !self.schema
    }
}
