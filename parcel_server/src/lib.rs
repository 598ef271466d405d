//! # Parcel server
//! This crate hosts the HTTP server for the parcel tracker. It is responsible for:
//! * Answering client status queries ("where is my order?").
//! * Exposing the staff API: creating and editing orders, changing statuses one at a time or in bulk, importing
//!   orders, managing participants, payment reminders, subscriptions and addresses.
//! * Delivering status notifications to subscribers through the Telegram Bot API.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following public routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/status/{order_id}`: The client-facing status query.
//!
//! Everything else lives under `/api` and requires the caller's id in the `parcel_admin_id` header to be on the admin
//! allowlist. See [routes](routes/index.html).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
