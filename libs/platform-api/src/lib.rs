//! App Platform API models
//!
//! Request and response envelopes spoken by the `/v2/apps` and
//! `/v2/databases` endpoints.

pub mod models;

pub use models::*;
