//! Build, package and publish HTML documentation to a web host over SSH.

pub mod archive;
pub mod config;
pub mod deploy;
pub mod error;
pub mod remote;
pub mod timestamp;

pub use error::{DeployError, Error, Result};
