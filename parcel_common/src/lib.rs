//! Small helpers shared by the parcel tracker crates.
mod helpers;
mod secret;

pub use helpers::{parse_boolean_flag, parse_id_list, parse_list, ListParseError};
pub use secret::Secret;
