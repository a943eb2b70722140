//! API credentials

pub mod credentials;
