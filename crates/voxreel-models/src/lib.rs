//! Shared data models for the Voxreel assembly engine.
//!
//! This crate provides the pure (no I/O) parts of the pipeline:
//! - Aspect-ratio geometry and crop/scale planning
//! - Timeline assembly against a target narration duration
//! - Encoding configuration

pub mod encoding;
pub mod geometry;
pub mod timeline;

// Re-export common types
pub use encoding::EncodingConfig;
pub use geometry::{AspectRatio, AspectRatioParseError, FramePlan};
pub use timeline::{AssemblyError, Segment, Timeline};
