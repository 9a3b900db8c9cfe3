//! hlsforge - upload media over HTTP, get HLS back
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod in_flight;
pub mod intake;
pub mod pipeline;
pub mod publish;
pub mod reaper;
pub mod server;
pub mod transcode;
