//! Configuration and on-disk layout

pub mod environment;
pub mod layout;
pub mod settings;
