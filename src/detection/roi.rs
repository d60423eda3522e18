use image::DynamicImage;

use crate::error::{PipelineError, Result};
use crate::models::BoundingBox;

/// Crop `image[y_min:y_max, x_min:x_max]`.
///
/// Coordinates are truncated to integers and clamped to the image, so a box
/// hanging over the border yields the part that lies inside it. A box that
/// has no pixels left after clamping is an `InvalidRegion`.
pub fn extract_roi(image: &DynamicImage, bbox: &BoundingBox) -> Result<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let rect = bbox.to_pixel_rect();

    let x_min = rect.x_min.clamp(0, width as i64) as u32;
    let y_min = rect.y_min.clamp(0, height as i64) as u32;
    let x_max = rect.x_max.clamp(0, width as i64) as u32;
    let y_max = rect.y_max.clamp(0, height as i64) as u32;

    if x_min >= x_max || y_min >= y_max {
        return Err(PipelineError::InvalidRegion {
            bbox: *bbox,
            image_width: width,
            image_height: height,
        });
    }

    Ok(image.crop_imm(x_min, y_min, x_max - x_min, y_max - y_min))
}
