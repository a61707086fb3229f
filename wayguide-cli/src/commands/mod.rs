//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`route_info`] - Routing document summary
//! - [`simulate`] - Synthetic drive against a live navigation session

pub mod route_info;
pub mod simulate;
