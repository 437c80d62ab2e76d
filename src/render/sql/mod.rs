//! SQL rendering for merge jobs
//!
//! Every statement the merge emits is built here from catalog descriptors, so identifier
//! quoting and schema re-qualification happen in one place.

pub mod constraint;
pub mod copy;
pub mod index;
pub mod sequence;
pub mod table;

pub use constraint::render_add_foreign_key;
pub use copy::{ConflictAction, InsertSelect, render_count_rows};
pub use index::render_create_index;
pub use sequence::{
    owned_sequence_name, render_create_sequence, render_reseed, render_sequence_owned_by,
    sequence_backed_columns,
};
pub use table::{render_create_schema, render_create_table, render_drop_table};
