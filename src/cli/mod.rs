pub mod config;
pub mod deploy;
pub mod package;
pub mod timestamp;
