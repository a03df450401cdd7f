//! Data models

pub mod request;
pub mod revision;
