// THEORY:
// The `mask` module is the bridge between a background-subtraction mask and the
// geometric core. A raw foreground mask is noisy: isolated speckles from sensor
// noise, and real objects split into several disconnected fragments. Before
// the `BoxClusterer` can do its work, the mask is cleaned up and every
// connected region is turned into a candidate rectangle.
//
// Steps:
// 1.  **Binarize**: any nonzero pixel is foreground.
// 2.  **Open**: erosion followed by dilation with a small square element
//     removes speckles narrower than the element.
// 3.  **Dilate**: a larger dilation grows the surviving regions so that nearby
//     fragments of one object touch or overlap.
// 4.  **Label**: 8-connected component labelling; each component's bounding
//     rectangle becomes one candidate box.

use crate::core_modules::bounding_box::BoundingBox;
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, open};
use imageproc::rect::Rect;
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;
use tracing::debug;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Morphology settings for mask cleanup. Radii use the chessboard norm, so a
/// radius of `r` is a `(2r + 1) x (2r + 1)` square; `0` skips the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskConfig {
    /// Radius of the opening used to remove speckle noise.
    pub open_radius: u8,
    /// Radius of the dilation used to join fragments. Ten passes of a 3x3
    /// dilation equal one dilation of radius 10.
    pub dilate_radius: u8,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            open_radius: 1,
            dilate_radius: 10,
        }
    }
}

/// Cleans foreground masks and extracts candidate rectangles from them.
#[derive(Debug, Clone, Default)]
pub struct MaskPreprocessor {
    config: MaskConfig,
}

impl MaskPreprocessor {
    pub fn new(config: MaskConfig) -> Self {
        Self { config }
    }

    /// Binarizes, denoises and enhances a mask.
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let mut binary = mask.clone();
        for pixel in binary.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > 0 { FOREGROUND } else { BACKGROUND };
        }

        let opened = match self.config.open_radius {
            0 => binary,
            r => open(&binary, Norm::LInf, r),
        };
        match self.config.dilate_radius {
            0 => opened,
            r => dilate(&opened, Norm::LInf, r),
        }
    }

    /// Bounding rectangles of the 8-connected foreground regions of an
    /// already-cleaned mask.
    pub fn component_boxes(&self, cleaned: &GrayImage) -> Vec<BoundingBox> {
        let labelled = connected_components(cleaned, Connectivity::Eight, Luma([BACKGROUND]));

        // label -> (min_x, min_y, max_x, max_y)
        let mut regions: HashMap<u32, (u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labelled.enumerate_pixels() {
            let label = label.0[0];
            if label == 0 {
                continue;
            }
            regions
                .entry(label)
                .and_modify(|(min_x, min_y, max_x, max_y)| {
                    *min_x = (*min_x).min(x);
                    *min_y = (*min_y).min(y);
                    *max_x = (*max_x).max(x);
                    *max_y = (*max_y).max(y);
                })
                .or_insert((x, y, x, y));
        }

        regions
            .into_values()
            .map(|(min_x, min_y, max_x, max_y)| {
                let rect = Rect::at(min_x as i32, min_y as i32)
                    .of_size(max_x - min_x + 1, max_y - min_y + 1);
                BoundingBox::from_rect(rect)
            })
            .collect()
    }

    /// Full preprocessing: `clean` followed by `component_boxes`.
    pub fn candidates(&self, mask: &GrayImage) -> Vec<BoundingBox> {
        let cleaned = self.clean(mask);
        let boxes = self.component_boxes(&cleaned);
        debug!(
            width = mask.width(),
            height = mask.height(),
            candidates = boxes.len(),
            "extracted candidate boxes from mask"
        );
        boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x, y, w, h) in rects {
            for py in y..y + h {
                for px in x..x + w {
                    mask.put_pixel(px, py, Luma([255]));
                }
            }
        }
        mask
    }

    fn sorted(mut boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
        boxes.sort();
        boxes
    }

    #[test]
    fn empty_mask_has_no_candidates() {
        let pre = MaskPreprocessor::default();
        assert!(pre.candidates(&GrayImage::new(64, 64)).is_empty());
    }

    #[test]
    fn component_boxes_have_exclusive_far_edges() {
        let pre = MaskPreprocessor::default();
        let mask = mask_with(100, 100, &[(10, 20, 5, 7), (60, 60, 1, 1)]);
        let boxes = sorted(pre.component_boxes(&mask));
        assert_eq!(
            boxes,
            vec![BoundingBox::new(10, 20, 15, 27), BoundingBox::new(60, 60, 61, 61)]
        );
    }

    #[test]
    fn diagonal_neighbours_are_one_component() {
        let pre = MaskPreprocessor::default();
        let mask = mask_with(20, 20, &[(5, 5, 1, 1), (6, 6, 1, 1)]);
        assert_eq!(pre.component_boxes(&mask), vec![BoundingBox::new(5, 5, 7, 7)]);
    }

    #[test]
    fn opening_removes_speckles() {
        let pre = MaskPreprocessor::new(MaskConfig {
            open_radius: 1,
            dilate_radius: 0,
        });
        let mask = mask_with(100, 100, &[(10, 10, 1, 1), (50, 50, 20, 20)]);
        assert_eq!(pre.candidates(&mask), vec![BoundingBox::new(50, 50, 70, 70)]);
    }

    #[test]
    fn dilation_grows_regions_by_its_radius() {
        let pre = MaskPreprocessor::default();
        let mask = mask_with(200, 200, &[(50, 50, 20, 20)]);
        assert_eq!(pre.candidates(&mask), vec![BoundingBox::new(40, 40, 80, 80)]);
    }

    #[test]
    fn dilation_joins_nearby_fragments() {
        let pre = MaskPreprocessor::default();
        // 15 px apart: both grow by 10 and overlap.
        let mask = mask_with(200, 200, &[(50, 50, 20, 20), (85, 50, 20, 20)]);
        assert_eq!(pre.candidates(&mask), vec![BoundingBox::new(40, 40, 115, 80)]);
    }

    #[test]
    fn any_nonzero_pixel_is_foreground() {
        let pre = MaskPreprocessor::new(MaskConfig {
            open_radius: 0,
            dilate_radius: 0,
        });
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(3, 4, Luma([1]));
        let cleaned = pre.clean(&mask);
        assert_eq!(cleaned.get_pixel(3, 4).0[0], 255);
        assert_eq!(pre.candidates(&mask), vec![BoundingBox::new(3, 4, 4, 5)]);
    }
}
