//! Size-targeted re-encoding of uploaded files.
//!
//! Images are re-encoded while a quality parameter is binary searched in
//! [`MIN_QUALITY`, `MAX_QUALITY`] until the output lands within [`SIZE_TOLERANCE`]
//! of the target. JPEG uses the encoder's own quality setting. The PNG and WebP
//! encoders are lossless, so for them the quality scales the pixel dimensions.
//! Other binary files are gzipped whole. The result only replaces the input when
//! it is smaller.

use std::{borrow::Cow, io::Write};

use flate2::{Compression, write::GzEncoder};
use image::{
    DynamicImage, ImageResult,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilter, PngEncoder},
        webp::WebPEncoder,
    },
    imageops::FilterType,
};

pub const DEFAULT_TARGET_SIZE: usize = 200 * 1024;
pub const SIZE_TOLERANCE: usize = 1024;
pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image(ImageKind),
    Gif,
    Binary,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => FileKind::Image(ImageKind::Jpeg),
            "png" => FileKind::Image(ImageKind::Png),
            "webp" => FileKind::Image(ImageKind::Webp),
            "gif" => FileKind::Gif,
            _ => FileKind::Binary,
        }
    }
}

#[derive(Debug)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    /// Quality the image was re-encoded at, if it was.
    pub quality: Option<u8>,
    pub gzipped: bool,
}

impl Compressed {
    fn unchanged(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            quality: None,
            gzipped: false,
        }
    }

    pub fn is_modified(&self) -> bool {
        self.quality.is_some() || self.gzipped
    }
}

/// CPU bound; call it from a blocking task.
pub fn compress_to_target(data: Vec<u8>, kind: FileKind, target: usize) -> Compressed {
    if data.len() <= target {
        return Compressed::unchanged(data);
    }

    match kind {
        FileKind::Image(image_kind) => match compress_image(&data, image_kind, target) {
            Ok(Some((bytes, quality))) if bytes.len() < data.len() => {
                tracing::debug!(
                    "Re-encoded {:?} from {} to {} bytes at quality {}",
                    image_kind,
                    data.len(),
                    bytes.len(),
                    quality
                );
                Compressed {
                    bytes,
                    quality: Some(quality),
                    gzipped: false,
                }
            }
            Ok(_) => Compressed::unchanged(data),
            Err(e) => {
                tracing::warn!("Image compression skipped: {}", e);
                Compressed::unchanged(data)
            }
        },
        // Re-encoding would drop every frame but the first.
        FileKind::Gif => Compressed::unchanged(data),
        FileKind::Binary => match gzip(&data) {
            Ok(bytes) if bytes.len() < data.len() => Compressed {
                bytes,
                quality: None,
                gzipped: true,
            },
            Ok(_) => Compressed::unchanged(data),
            Err(e) => {
                tracing::warn!("Gzip compression skipped: {}", e);
                Compressed::unchanged(data)
            }
        },
    }
}

fn compress_image(data: &[u8], kind: ImageKind, target: usize) -> ImageResult<Option<(Vec<u8>, u8)>> {
    let img = image::load_from_memory(data)?;
    search_quality(target, |quality| encode(&img, kind, quality))
}

/// Binary search over quality. Returns the first encoding within tolerance, else the
/// highest quality under the target, else the smallest encoding seen.
pub fn search_quality<F>(target: usize, mut encode: F) -> ImageResult<Option<(Vec<u8>, u8)>>
where
    F: FnMut(u8) -> ImageResult<Vec<u8>>,
{
    let (mut low, mut high) = (MIN_QUALITY, MAX_QUALITY);
    let mut under: Option<(Vec<u8>, u8)> = None;
    let mut smallest_over: Option<(Vec<u8>, u8)> = None;

    while low <= high {
        let mid = low + (high - low) / 2;
        let encoded = encode(mid)?;
        let size = encoded.len();

        if size.abs_diff(target) <= SIZE_TOLERANCE {
            return Ok(Some((encoded, mid)));
        }

        if size > target {
            if smallest_over.as_ref().is_none_or(|(b, _)| size < b.len()) {
                smallest_over = Some((encoded, mid));
            }
            high = mid - 1;
        } else {
            under = Some((encoded, mid));
            low = mid + 1;
        }
    }

    Ok(under.or(smallest_over))
}

fn encode(img: &DynamicImage, kind: ImageKind, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();

    match kind {
        ImageKind::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
        }
        ImageKind::Png => {
            let scaled = scale_for_quality(img, quality);
            scaled.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        ImageKind::Webp => {
            let rgba = DynamicImage::ImageRgba8(scale_for_quality(img, quality).to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
        }
    }

    Ok(buf)
}

fn scale_for_quality(img: &DynamicImage, quality: u8) -> Cow<'_, DynamicImage> {
    if quality >= MAX_QUALITY {
        return Cow::Borrowed(img);
    }

    let factor = f64::from(quality) / f64::from(MAX_QUALITY);
    let width = ((f64::from(img.width()) * factor).round() as u32).max(1);
    let height = ((f64::from(img.height()) * factor).round() as u32).max(1);

    Cow::Owned(img.resize_exact(width, height, FilterType::Triangle))
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use image::{ImageFormat, RgbImage};
    use std::io::{Cursor, Read};

    fn noise_image(width: u32, height: u32) -> RgbImage {
        let mut state: u32 = 0x2545_F491;
        RgbImage::from_fn(width, height, |_, _| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state & 0xFF) as u8
            };
            image::Rgb([next(), next(), next()])
        })
    }

    fn encoded(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(img.clone())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut cursor, 100))
                .unwrap();
        } else {
            img.write_to(&mut cursor, format).unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn kind_is_chosen_by_extension() {
        assert_eq!(FileKind::from_extension("JPEG"), FileKind::Image(ImageKind::Jpeg));
        assert_eq!(FileKind::from_extension("webp"), FileKind::Image(ImageKind::Webp));
        assert_eq!(FileKind::from_extension("gif"), FileKind::Gif);
        assert_eq!(FileKind::from_extension("pdf"), FileKind::Binary);
    }

    #[test]
    fn search_stops_inside_tolerance() {
        let mut tried = Vec::new();
        let (bytes, quality) = search_quality(20_000, |q| {
            tried.push(q);
            Ok(vec![0; usize::from(q) * 1000 + 500])
        })
        .unwrap()
        .unwrap();

        assert_eq!(quality, 19);
        assert_eq!(bytes.len(), 19_500);
        assert_eq!(tried, vec![50, 29, 19]);
    }

    #[test]
    fn search_keeps_highest_quality_under_target() {
        let (bytes, quality) = search_quality(100_000, |q| Ok(vec![0; usize::from(q) * 7000]))
            .unwrap()
            .unwrap();

        assert_eq!(quality, 14);
        assert_eq!(bytes.len(), 98_000);
    }

    #[test]
    fn search_falls_back_to_minimum_quality() {
        let (bytes, quality) = search_quality(47_000, |q| Ok(vec![0; usize::from(q) * 5000]))
            .unwrap()
            .unwrap();

        assert_eq!(quality, MIN_QUALITY);
        assert_eq!(bytes.len(), 50_000);
    }

    #[test]
    fn small_inputs_are_left_alone() {
        let data = encoded(&noise_image(8, 8), ImageFormat::Png);
        let result = compress_to_target(data.clone(), FileKind::from_extension("png"), DEFAULT_TARGET_SIZE);

        assert!(!result.is_modified());
        assert_eq!(result.bytes, data);
    }

    #[test]
    fn jpeg_is_reencoded_near_target() {
        let data = encoded(&noise_image(320, 320), ImageFormat::Jpeg);
        let target = 30_000;
        assert!(data.len() > target);

        let result = compress_to_target(data, FileKind::Image(ImageKind::Jpeg), target);

        assert!(result.bytes.len() <= target + SIZE_TOLERANCE);
        let quality = result.quality.expect("jpeg should be re-encoded");
        assert!((MIN_QUALITY..=MAX_QUALITY).contains(&quality));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 320));
    }

    #[test]
    fn png_is_downscaled_toward_target() {
        let data = encoded(&noise_image(200, 200), ImageFormat::Png);
        let target = 40_000;
        assert!(data.len() > target);

        let result = compress_to_target(data, FileKind::Image(ImageKind::Png), target);

        assert!(result.quality.is_some());
        assert!(result.bytes.len() <= target + SIZE_TOLERANCE);
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert!(decoded.width() < 200);
    }

    #[test]
    fn undecodable_image_is_kept_verbatim() {
        let data = b"definitely not a jpeg ".repeat(100);
        let result = compress_to_target(data.clone(), FileKind::Image(ImageKind::Jpeg), 64);

        assert!(!result.is_modified());
        assert_eq!(result.bytes, data);
    }

    #[test]
    fn binary_files_are_gzipped_whole() {
        let data = b"%PDF-1.7 repeated stream content\n".repeat(2000);
        let result = compress_to_target(data.clone(), FileKind::Binary, 1024);

        assert!(result.gzipped);
        assert!(result.bytes.len() < data.len());

        let mut restored = Vec::new();
        GzDecoder::new(result.bytes.as_slice())
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn incompressible_binary_is_not_gzipped() {
        let data = noise_image(64, 64).into_raw();
        let result = compress_to_target(data.clone(), FileKind::Binary, 1024);

        assert!(!result.gzipped);
        assert_eq!(result.bytes, data);
    }
}
