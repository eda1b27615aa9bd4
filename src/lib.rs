//! pkg-lumo library exports.
//!
//! The binary is a thin clap front end over these modules; integration
//! tests drive the pipeline through them directly.

pub mod codec;
pub mod commands;
pub mod common;
pub mod config;
pub mod error;
pub mod options;
pub mod overrides;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod process;
pub mod prompts;
pub mod timing;
pub mod version;
