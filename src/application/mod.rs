//! Application layer: collaborator ports and the provisioning workflow.

pub mod ports;
pub mod provision;
