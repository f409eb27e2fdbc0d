//! Port traits the domain talks to. Adapters in [`crate::adapters`]
//! implement them.

pub mod config_port;
pub mod data_port;
pub mod report_port;
