//! INSERT ... SELECT rendering for moving rows from a source table into the target

use crate::render::{column_list, qualified_name};

/// What an insert does when a row collides with one already in the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// Plain insert; a collision is an error
    None,
    /// `ON CONFLICT DO NOTHING`, against any unique constraint
    DoNothing,
    /// `ON CONFLICT (key) DO NOTHING`
    DoNothingOn { key: Vec<String> },
    /// `ON CONFLICT (key) DO UPDATE SET col = EXCLUDED.col`: the incoming row wins
    DoUpdate { key: Vec<String>, set: Vec<String> },
}

impl ConflictAction {
    fn render(&self) -> Option<String> {
        match self {
            ConflictAction::None => None,
            ConflictAction::DoNothing => Some("ON CONFLICT DO NOTHING".to_string()),
            ConflictAction::DoNothingOn { key } => {
                Some(format!("ON CONFLICT ({}) DO NOTHING", column_list(key)))
            }
            ConflictAction::DoUpdate { key, set } => {
                let assignments = set
                    .iter()
                    .map(|c| {
                        let col = crate::render::quote_ident(c);
                        format!("{} = EXCLUDED.{}", col, col)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!(
                    "ON CONFLICT ({}) DO UPDATE SET {}",
                    column_list(key),
                    assignments
                ))
            }
        }
    }
}

/// `INSERT INTO target.table (cols) SELECT cols FROM source.table [ON CONFLICT ...]`
#[derive(Debug, Clone)]
pub struct InsertSelect<'a> {
    pub target: &'a str,
    pub source: &'a str,
    pub table: &'a str,
    pub columns: &'a [String],
    pub conflict: &'a ConflictAction,
    /// Collapse source rows sharing this key to the physically last one, so an upsert
    /// never touches the same target row twice in one statement
    pub distinct_on: Option<&'a [String]>,
}

impl InsertSelect<'_> {
    pub fn render(&self) -> String {
        self.assemble(None, None)
    }

    /// One window of a batched copy. Rows are ordered by `order_by` (the source's primary
    /// key) or by `ctid` when there is none, so consecutive windows never overlap.
    pub fn render_batch(&self, order_by: &[String], limit: u64, offset: u64) -> String {
        let order = if order_by.is_empty() {
            "ctid".to_string()
        } else {
            column_list(order_by)
        };
        self.assemble(Some(order), Some((limit, offset)))
    }

    /// Row count the batch windows are planned over
    pub fn render_count(&self) -> String {
        match self.distinct_on {
            Some(key) => format!(
                "SELECT COUNT(*) FROM (SELECT DISTINCT {} FROM {}) AS keys",
                column_list(key),
                qualified_name(self.source, self.table)
            ),
            None => render_count_rows(self.source, self.table),
        }
    }

    fn assemble(&self, order: Option<String>, window: Option<(u64, u64)>) -> String {
        let columns = column_list(self.columns);
        let mut sql = format!(
            "INSERT INTO {} ({}) SELECT ",
            qualified_name(self.target, self.table),
            columns
        );
        let order = match self.distinct_on {
            Some(key) => {
                let key = column_list(key);
                sql.push_str(&format!("DISTINCT ON ({}) ", key));
                Some(format!("{}, ctid DESC", key))
            }
            None => order,
        };
        sql.push_str(&format!(
            "{} FROM {}",
            columns,
            qualified_name(self.source, self.table)
        ));
        if let Some(order) = order {
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some((limit, offset)) = window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }
        if let Some(conflict) = self.conflict.render() {
            sql.push(' ');
            sql.push_str(&conflict);
        }
        sql
    }
}

pub fn render_count_rows(schema: &str, table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", qualified_name(schema, table))
}
