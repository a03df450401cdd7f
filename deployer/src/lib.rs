//! Deploy Trigger Library
//!
//! Single-invocation deployment pipeline: resolve the target, download the
//! artifact, zip it with its deployment descriptors, upload the bundle, then
//! register the revision and start a deployment.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
