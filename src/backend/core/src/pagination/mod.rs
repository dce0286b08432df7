//! Cursor-based pagination utilities.
//!
//! Listing endpoints return an opaque `next_cursor` token; passing it back as
//! `start_after` resumes the ordered scan where the previous page ended.

mod cursor;

pub use cursor::{Cursor, SortDirection};
