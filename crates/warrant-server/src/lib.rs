//! Warrant Server - configuration, logging and the administration commands
//!
//! This crate wires the storage backend selected by configuration to the
//! consumer services and exposes them as command line operations.

pub mod command;
pub mod model;
pub mod startup;
