//! CLI command implementations.
//!
//! - [`run`] - Build the coverage index
//! - [`init`] - Write a default configuration file

pub mod common;
pub mod init;
pub mod run;
