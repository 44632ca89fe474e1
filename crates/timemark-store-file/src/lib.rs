//! JSON-file backend for Timemark slots.
//!
//! Each slot is a `<key>.json` file inside one directory. Writes land in a
//! sibling temporary file first and are renamed into place, so a reader sees
//! either the old document or the new one.

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::FileSlot;
