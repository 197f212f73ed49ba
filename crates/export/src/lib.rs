//! ClipTrim Export Pipeline
//!
//! Turns trim requests into saved clips, one at a time.
//!
//! # Pipeline Architecture
//!
//! ```text
//! enqueue(TrimRequest) ──► ExportQueue (pending, FIFO)
//!                               │  oldest pending, when idle
//!                               ▼
//!                          TrimExecutor ──► progress ──► task record
//!                               │
//!                               ▼ output bytes
//!                      PersistenceStrategy
//!                     ┌─────────┴──────────┐
//!            directory handle          no handle / write failed
//!                     │                    │
//!          NamingResolver::next_in_directory   NamingResolver::next_fallback
//!                     │                    │
//!          <dir>/export/{n}_{s}s.mp4    DownloadSink
//!                     └─────────┬──────────┘
//!                               ▼
//!                    completed / failed ──► reaped after delay
//! ```

pub mod download;
pub mod naming;
pub mod persist;
pub mod queue;
pub mod storage;
pub mod task;
pub mod view;

pub use download::*;
pub use naming::*;
pub use persist::*;
pub use queue::*;
pub use storage::*;
pub use task::*;
pub use view::*;
