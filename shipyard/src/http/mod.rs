//! HTTP access to the App Platform API

pub mod apps;
pub mod client;
