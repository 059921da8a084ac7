use crate::error::Result;
use image::{GrayImage, ImageEncoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes a single-channel mask to `path` as PNG. Handy for inspecting what
/// the morphology stage did to a frame.
pub fn save_mask<P: AsRef<Path>>(path: P, mask: &GrayImage) -> Result<()> {
    let output = BufWriter::new(File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);

    encoder.write_image(
        mask.as_raw(),
        mask.width(),
        mask.height(),
        image::ExtendedColorType::L8,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn saved_mask_reloads_unchanged() {
        let dir = std::env::temp_dir().join(format!("motion_boxes_masks_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gradient_mask.png");

        let mask = GrayImage::from_fn(64, 32, |x, y| Luma([((x + y) % 2 * 255) as u8]));
        save_mask(&path, &mask).expect("Error Saving File.");

        let reloaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(reloaded, mask);

        std::fs::remove_dir_all(&dir).ok();
    }
}
