//! SQLite storage backend for the parcel tracker.
mod sqlite_impl;

pub mod db;
pub use db::SqliteOptions;
pub use sqlite_impl::SqliteDatabase;
