//! Free-standing helpers: identifier extraction from noisy admin input, input validation and call deadlines.
mod deadline;
mod order_ids;
mod usernames;
mod validators;

pub use deadline::with_deadline;
pub use order_ids::{extract_order_id, extract_order_ids, split_tokens};
pub use usernames::{extract_usernames, normalize_username};
pub use validators::{country_for_order, normalize_phone, validate_postcode, ValidationError};
