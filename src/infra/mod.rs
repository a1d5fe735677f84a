//! Production adapters: filesystem, network, and external processes.

pub mod build;
pub mod envfile;
pub mod fetch;
pub mod git;
pub mod render;
pub mod systemd;
