//! Type definitions for relay configuration and backoff policies

mod policy;
mod relay_config;

pub use policy::*;
pub use relay_config::*;
