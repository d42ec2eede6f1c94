use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};
use thiserror::Error;

/// Errors from encoding or resizing frames.
#[derive(Debug, Error)]
pub enum CompressError {
    #[error("buffer of {len} bytes does not match {width}x{height} RGB")]
    Dimensions { len: usize, width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("resize failed: {0}")]
    Resize(String),
}

/// Compress raw RGB pixel data to JPEG at the given quality (1-100).
pub fn compress_jpeg(
    data: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, CompressError> {
    let img: ImageBuffer<Rgb<u8>, _> =
        ImageBuffer::from_raw(width, height, data).ok_or(CompressError::Dimensions {
            len: data.len(),
            width,
            height,
        })?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|e| CompressError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Downscale raw RGB data so its width is at most `max_width`, keeping the
/// aspect ratio. Returns the input unchanged when it is already small enough.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing.
pub fn downscale_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    max_width: u32,
) -> Result<(Vec<u8>, u32, u32), CompressError> {
    use fast_image_resize as fr;
    use fr::images::Image;

    if max_width == 0 || width <= max_width {
        return Ok((data.to_vec(), width, height));
    }

    let target_width = max_width;
    let target_height = ((u64::from(height) * u64::from(max_width)) / u64::from(width)).max(1) as u32;

    let src_image = Image::from_vec_u8(width, height, data.to_vec(), fr::PixelType::U8x3)
        .map_err(|_| CompressError::Dimensions {
            len: data.len(),
            width,
            height,
        })?;
    let mut dst_image = Image::new(target_width, target_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| CompressError::Resize(e.to_string()))?;

    Ok((dst_image.into_vec(), target_width, target_height))
}
