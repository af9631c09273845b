//! # noded-manager
//!
//! The supervisor core. The [`Manager`] brings a node online (register
//! endpoints, materialize and start services, start health watching),
//! keeps it healed (per-service watch tasks remediating on adverse health
//! events) and takes it offline again.

pub mod endpoints;
pub mod manager;


pub use manager::{wait_start, Manager, ManagerConfig};
