pub mod client;

pub use client::{AdaptResponse, AdaptWarning, AdminClient, CaddyError, LoadOutcome};
