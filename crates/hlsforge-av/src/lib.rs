//! # hlsforge-av
//!
//! The external transcoding engine and everything needed to drive it:
//!
//! - Locating ffmpeg (configured path or `PATH`)
//! - Building the deterministic HLS invocation from [`HlsSettings`]
//! - Starting, waiting on, and killing engine processes through the
//!   [`Engine`] / [`EngineProcess`] capability
//!
//! ## Example
//!
//! ```no_run
//! use hlsforge_av::{Engine, FfmpegEngine, HlsInvocation, HlsSettings};
//!
//! # async fn example() -> hlsforge_av::Result<()> {
//! let engine = FfmpegEngine::discover(None)?;
//! let invocation = HlsInvocation::new("upload.mp4", "out/", HlsSettings::default());
//! let mut process = engine.start(&invocation).await?;
//! let exit = process.wait().await?;
//! println!("ffmpeg finished: {exit}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
mod error;
pub mod hls;
pub mod tools;

// Re-exports
pub use engine::{ChildProcess, Engine, EngineExit, EngineProcess, FfmpegEngine};
pub use error::{Error, Result};
pub use hls::{HlsInvocation, HlsSettings};
pub use tools::{check_ffmpeg, get_tool_path, require_tool, ToolInfo};
