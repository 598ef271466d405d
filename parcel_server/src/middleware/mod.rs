mod admin;

pub use admin::{AdminMiddlewareFactory, AdminMiddlewareService, ADMIN_ID_HEADER};
