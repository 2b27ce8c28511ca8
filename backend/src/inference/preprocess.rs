use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::detection::Shape;
use crate::error::InspectionError;

/// Decodes an uploaded photo of any supported format into RGB.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InspectionError> {
    if bytes.is_empty() {
        return Err(InspectionError::DecodeFailure("empty upload".to_string()));
    }
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| InspectionError::DecodeFailure(e.to_string()))
}

pub fn image_shape(image: &RgbImage) -> Shape {
    Shape::new(image.height(), image.width())
}

/// Resizes to the model input and lays pixels out as NCHW floats in
/// `[0, 1]`, channels in RGB order.
pub fn blob_from_image(image: &RgbImage, input: Shape) -> Vec<f32> {
    let resized;
    let image = if image.width() == input.width && image.height() == input.height {
        image
    } else {
        resized = imageops::resize(image, input.width, input.height, FilterType::Triangle);
        &resized
    };

    let (w, h) = (input.width as usize, input.height as usize);
    let plane = w * h;
    let mut blob = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in image.enumerate_pixels() {
        let idx = y as usize * w + x as usize;
        for channel in 0..3 {
            blob[channel * plane + idx] = pixel[channel] as f32 / 255.0;
        }
    }
    blob
}
