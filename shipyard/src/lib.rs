//! Shipyard Library
//!
//! Deployment submission and status polling for App Platform.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
