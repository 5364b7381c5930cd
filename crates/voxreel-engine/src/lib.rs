//! Batch driver for the Voxreel assembly engine.
//!
//! Walks a date-stamped batch tree (`voices/`, `videos/`), pairs each
//! narration track with its clip pool, and renders one composite per
//! group under `videos_out/`. Groups run strictly sequentially; a
//! failed group is counted and skipped, never fatal to the batch.

pub mod batch;
pub mod config;
pub mod error;
pub mod group;
pub mod loader;

pub use batch::{discover_groups, run_batch, BatchSummary, GroupSpec};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use group::process_group;
pub use loader::{list_clip_files, load_pool, LoadedClip};
