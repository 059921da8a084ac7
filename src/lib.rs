// THEORY:
// This file is the main entry point for the `motion_boxes` library crate.
// It exposes the `DetectionPipeline` (mask in, boxes out) and its parallel
// counterpart as the high-level interface, and the geometric core
// (`BoundingBox`, `BoxClusterer`) for callers that already have candidate
// rectangles from their own contour extraction.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::bounding_box::BoundingBox;
pub use core_modules::box_clusterer::{BoxClusterer, ClustererConfig};
pub use core_modules::mask::{MaskConfig, MaskPreprocessor};
pub use error::{Error, Result};
pub use parallel_pipeline::{FrameBoxes, ParallelPipeline};
pub use pipeline::{DetectionPipeline, PipelineConfig};
