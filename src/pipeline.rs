// THEORY:
// The `pipeline` module is the top-level API for turning a single foreground
// mask into the final set of object boxes. It strings together the two layers
// of the engine:
//
// 1.  **Mask Layer** (`MaskPreprocessor`): denoise, enhance and label the mask,
//     producing raw candidate rectangles.
// 2.  **Geometric Layer** (`BoxClusterer`): merge the candidates to a fixed
//     point and drop the ones too small to matter.
//
// Masks can optionally be processed at reduced resolution. Morphology and
// labelling cost scales with pixel count, so detecting on a quarter-size mask
// and scaling the boxes back up is far cheaper at a small cost in edge
// precision. The merge distance, minimum size and morphology radii then apply
// in the reduced coordinate space.
//
// The pipeline keeps no state between frames; `detect` takes `&self` and the
// same instance can serve any number of threads.

use crate::core_modules::bounding_box::BoundingBox;
use crate::core_modules::box_clusterer::{BoxClusterer, ClustererConfig};
use crate::core_modules::mask::{MaskConfig, MaskPreprocessor};
use crate::error::{Error, Result};
use image::GrayImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Configuration for the DetectionPipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub clusterer: ClustererConfig,
    pub mask: MaskConfig,
    /// Resolution factor applied to masks before detection, in `(0, 1]`.
    /// Boxes are scaled back by `1 / scale` afterwards.
    pub scale: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clusterer: ClustererConfig::default(),
            mask: MaskConfig::default(),
            scale: 1.0,
        }
    }
}

/// Mask-to-boxes detector for single frames.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    preprocessor: MaskPreprocessor,
    clusterer: BoxClusterer,
    scale: f64,
}

impl DetectionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if !config.scale.is_finite() || config.scale <= 0.0 || config.scale > 1.0 {
            return Err(Error::InvalidArgument(format!(
                "scale must be in (0, 1], got {}",
                config.scale
            )));
        }
        Ok(Self {
            preprocessor: MaskPreprocessor::new(config.mask),
            clusterer: BoxClusterer::from_config(config.clusterer)?,
            scale: config.scale,
        })
    }

    pub fn preprocessor(&self) -> &MaskPreprocessor {
        &self.preprocessor
    }

    /// The mask actually fed to the morphology stage: `mask` itself, or a
    /// resized copy when a scale below 1 is configured.
    pub fn working_mask(&self, mask: &GrayImage) -> GrayImage {
        if self.scale >= 1.0 {
            return mask.clone();
        }
        let width = ((mask.width() as f64 * self.scale).round() as u32).max(1);
        let height = ((mask.height() as f64 * self.scale).round() as u32).max(1);
        imageops::resize(mask, width, height, FilterType::Triangle)
    }

    /// Detects object boxes in one foreground mask, in the mask's own
    /// pixel coordinates.
    pub fn detect(&self, mask: &GrayImage) -> Vec<BoundingBox> {
        let working = self.working_mask(mask);
        let candidates = self.preprocessor.candidates(&working);
        let boxes = self.clusterer.detect(candidates);

        if self.scale >= 1.0 {
            return boxes;
        }
        let inverse = 1.0 / self.scale;
        debug!(scale = self.scale, boxes = boxes.len(), "scaling boxes back to source resolution");
        boxes.into_iter().map(|b| b.scale(inverse)).collect()
    }
}
