//! Deployment module

pub mod compensation;
pub mod executor;
pub mod fetch;
pub mod fsm;
pub mod handler;
pub mod package;
pub mod publish;
pub mod register;
pub mod target;
