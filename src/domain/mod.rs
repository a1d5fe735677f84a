//! Pure domain types and validators — no I/O, no async, no process spawning.

pub mod error;
pub mod node;

pub use error::ProvisionError;
pub use node::{NodeIdentity, PortAllocation, ProvisionConfig};
