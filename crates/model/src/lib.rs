//! ClipTrim Model
//!
//! Defines the data contracts shared by the export pipeline:
//! - **Trim:** Export modes and the `(start, duration, mode, fps)` parameters
//! - **Task:** Task identity, lifecycle status, and progress samples
//! - **Media:** Source files accepted for import
//! - **Naming:** The `{seq}_{secs}s.mp4` output naming convention
//!
//! Everything here is plain data. Scheduling, transcoding, and storage live
//! in the engine and export crates.

pub mod media;
pub mod naming;
pub mod task;
pub mod trim;

pub use media::*;
pub use naming::*;
pub use task::*;
pub use trim::*;
