use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::contrast::equalize_histogram;

/// Plate crops smaller than this are upscaled before recognition
pub const MIN_PLATE_HEIGHT: u32 = 32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Spread the histogram so faded plates get usable contrast
pub fn equalize(img: &GrayImage) -> GrayImage {
    equalize_histogram(img)
}

/// Upscale so the crop is at least `min_height` tall, keeping aspect ratio
pub fn upscale_to_height(img: &GrayImage, min_height: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if height == 0 || height >= min_height {
        return img.clone();
    }
    let scale = min_height as f32 / height as f32;
    let new_width = ((width as f32 * scale).round() as u32).max(1);
    image::imageops::resize(img, new_width, min_height, FilterType::CatmullRom)
}

/// Grayscale, optionally equalize, then upscale small crops
pub fn prepare_plate_crop(img: &DynamicImage, equalize_contrast: bool) -> DynamicImage {
    let mut gray = to_grayscale(img);
    if equalize_contrast {
        gray = equalize(&gray);
    }
    DynamicImage::ImageLuma8(upscale_to_height(&gray, MIN_PLATE_HEIGHT))
}
