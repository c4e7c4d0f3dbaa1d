//! Row codec for tablekit.
//!
//! Records cross the store boundary as [`Row`]s: maps from column name to
//! a tagged [`Value`]. Tables encode records into rows for writes and
//! decode fetched rows back into records.

pub mod row;
pub mod value;

pub use row::Row;
pub use value::{Value, to_hex};
