//! # shapegate engine
//!
//! Batch validation orchestration
//! Validates many graphs against one shared rule set and aggregates the outcome

pub mod batch;
pub mod config;
pub mod discovery;

pub use batch::*;
pub use config::*;
pub use discovery::*;
