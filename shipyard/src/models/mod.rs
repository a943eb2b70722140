//! Data models

pub mod database;
pub mod deployment;
pub mod request;
