//! Rendered migration plans.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::MigrationError;
use super::steps::MigrationStep;
use crate::schema::Database;

/// The input to a [`Planner`]: two snapshots and the steps between them.
#[derive(Debug, Clone)]
pub struct Migration<'a> {
    /// The live schema the steps apply to.
    pub before: &'a Database,
    /// The target schema.
    pub after: &'a Database,
    /// Sorted steps, as produced by the differ.
    pub changes: Vec<MigrationStep>,
}

impl<'a> Migration<'a> {
    /// Bundle a diff with the snapshots it was computed from.
    pub fn new(before: &'a Database, after: &'a Database, changes: Vec<MigrationStep>) -> Self {
        Self {
            before,
            after,
            changes,
        }
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Renders migration steps into executable statements.
pub trait Planner {
    /// Render every step of the migration, in order.
    fn plan(&self, migration: &Migration<'_>) -> Result<MigrationPlan, MigrationError>;
}

/// An ordered list of statements, one per migration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Statements in execution order.
    pub statements: Vec<Statement>,
}

impl MigrationPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement.
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Whether the plan has no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Total number of executable steps.
    pub fn step_count(&self) -> usize {
        self.statements.iter().map(|s| s.steps.len()).sum()
    }

    /// All steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.statements.iter().flat_map(|s| s.steps.iter())
    }
}

/// Renders the plan as an SQL script.
impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{statement}")?;
        }
        Ok(())
    }
}

/// The rendering of one migration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Human-readable description of the step.
    pub comment: String,
    /// Commands to run in order.
    pub steps: Vec<Step>,
}

impl Statement {
    /// Create an empty statement.
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a step in place.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.comment.is_empty() {
            writeln!(f, "-- {}", self.comment)?;
        }
        for step in &self.steps {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// One executable command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Literal SQL text.
    pub cmd: String,
    /// Bind parameters for `$n` placeholders in `cmd`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Human-readable description, used to annotate failures.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl Step {
    /// Create a step without arguments.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the bind parameters.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.comment.is_empty() {
            writeln!(f, "-- {}", self.comment)?;
        }
        writeln!(f, "{};", self.cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_renders_as_script() {
        let mut plan = MigrationPlan::new();
        plan.push(Statement::new("Drop table old").with_step(Step::new("DROP TABLE \"old\"")));
        plan.push(
            Statement::new("Alter enum mood")
                .with_step(Step::new("BEGIN"))
                .with_step(Step::new("DROP TYPE \"mood_old\"").with_comment("Drop old enum"))
                .with_step(Step::new("COMMIT")),
        );

        assert_eq!(plan.step_count(), 4);
        assert_eq!(
            plan.to_string(),
            "-- Drop table old\n\
             DROP TABLE \"old\";\n\
             \n\
             -- Alter enum mood\n\
             BEGIN;\n\
             -- Drop old enum\n\
             DROP TYPE \"mood_old\";\n\
             COMMIT;\n"
        );
    }

    #[test]
    fn test_plan_json_omits_empty_fields() {
        let statement = Statement::new("Drop index a").with_step(Step::new("DROP INDEX \"a\""));
        let plan = MigrationPlan {
            statements: vec![statement],
        };
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(
            json,
            r#"{"statements":[{"comment":"Drop index a","steps":[{"cmd":"DROP INDEX \"a\""}]}]}"#
        );
        let back: MigrationPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
