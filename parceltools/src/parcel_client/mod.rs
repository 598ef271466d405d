mod client;

pub use client::ParcelServerClient;
