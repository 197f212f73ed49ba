//! ClipTrim Engine
//!
//! Turns `(source bytes, trim parameters)` into encoded output bytes by
//! driving an external transcode engine.
//!
//! # Invocation
//!
//! ```text
//! source bytes ──► write_file("input.mp4")
//!                        │
//! TrimParams ──► build_trim_args ──► exec ──► progress samples ──► callback
//!                                      │
//!                 read_file("output.mp4") ◄┘
//!                        │
//!                 delete input + output (always)
//!                        │
//!                        ▼
//!                  output bytes
//! ```
//!
//! The engine is loaded lazily, once per executor, on the first run.

pub mod command;
pub mod engine;
pub mod executor;
pub mod ffmpeg;
pub mod progress;

pub use command::*;
pub use engine::*;
pub use executor::*;
pub use ffmpeg::{FfmpegEngine, FfmpegLoader};
