// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading and saving images with their EXIF and ICC metadata.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageEncoder, ImageReader, RgbImage};
use rectify_core::{ImageMeta, RectifyError, Result, SupportedFormat};
use tiff::encoder::colortype::RGB8;
use tiff::encoder::{Compression, Predictor, TiffEncoder};
use tiff::tags::Tag;
use tracing::{debug, info, instrument, warn};

use super::exif::{embed_in_jpeg, reset_orientation};

/// Something that can produce an upright RGB image plus its metadata.
pub trait ImageSource {
    fn load(&self, path: &Path) -> Result<(RgbImage, ImageMeta)>;
}

/// Something that can persist an image, re-attaching metadata captured at load.
pub trait ImageSink {
    fn save(&self, image: &RgbImage, meta: &ImageMeta, path: &Path, quality: u8) -> Result<()>;
}

/// Local filesystem implementation of both traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageStore;

impl ImageSource for FsImageStore {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<(RgbImage, ImageMeta)> {
        SupportedFormat::from_path(path)?;

        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut decoder = reader.into_decoder().map_err(|err| decode_error(path, err))?;

        let icc_profile = decoder.icc_profile().map_err(|err| decode_error(path, err))?;
        let exif = decoder.exif_metadata().map_err(|err| decode_error(path, err))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

        let mut image = DynamicImage::from_decoder(decoder).map_err(|err| decode_error(path, err))?;
        image.apply_orientation(orientation);

        let meta = ImageMeta {
            exif,
            icc_profile,
            orientation: exif_orientation(orientation),
        };
        info!(
            width = image.width(),
            height = image.height(),
            orientation = meta.orientation,
            has_exif = meta.exif.is_some(),
            has_icc = meta.icc_profile.is_some(),
            "Image loaded"
        );
        Ok((image.to_rgb8(), meta))
    }
}

impl ImageSink for FsImageStore {
    #[instrument(skip(self, image, meta), fields(path = %path.display()))]
    fn save(&self, image: &RgbImage, meta: &ImageMeta, path: &Path, quality: u8) -> Result<()> {
        let format = SupportedFormat::from_path(path)?;
        let bytes = encode(image, meta, format, quality)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        info!(
            width = image.width(),
            height = image.height(),
            bytes = bytes.len(),
            "Image saved"
        );
        Ok(())
    }
}

/// Encode `image` in `format`, embedding the ICC profile where the encoder
/// supports it and, for JPEG, the original EXIF with orientation reset to 1.
/// TIFF output is LZW-compressed.
pub fn encode(
    image: &RgbImage,
    meta: &ImageMeta,
    format: SupportedFormat,
    quality: u8,
) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    match format {
        SupportedFormat::Jpeg => {
            let mut buffer = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            attach_icc(&mut encoder, meta, format);
            encoder
                .write_image(image.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(encode_error)?;

            let Some(exif) = &meta.exif else {
                return Ok(buffer);
            };
            let with_exif = reset_orientation(exif).and_then(|tiff| embed_in_jpeg(&buffer, &tiff));
            match with_exif {
                Ok(bytes) => Ok(bytes),
                Err(err) => {
                    warn!(%err, "EXIF could not be carried over; saving without it");
                    Ok(buffer)
                }
            }
        }
        SupportedFormat::Png => {
            let mut buffer = Vec::new();
            let mut encoder = PngEncoder::new(&mut buffer);
            attach_icc(&mut encoder, meta, format);
            encoder
                .write_image(image.as_raw(), w, h, ExtendedColorType::Rgb8)
                .map_err(encode_error)?;
            Ok(buffer)
        }
        SupportedFormat::Tiff => encode_tiff(image, meta),
    }
}

fn encode_tiff(image: &RgbImage, meta: &ImageMeta) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor)
            .map_err(tiff_error)?
            .with_compression(Compression::Lzw)
            .with_predictor(Predictor::Horizontal);
        let mut page = encoder
            .new_image::<RGB8>(image.width(), image.height())
            .map_err(tiff_error)?;
        if let Some(icc) = &meta.icc_profile {
            page.encoder()
                .write_tag(Tag::IccProfile, icc.as_slice())
                .map_err(tiff_error)?;
            debug!(bytes = icc.len(), "ICC profile attached");
        }
        page.write_data(image.as_raw()).map_err(tiff_error)?;
    }
    Ok(cursor.into_inner())
}

fn attach_icc<E: ImageEncoder>(encoder: &mut E, meta: &ImageMeta, format: SupportedFormat) {
    let Some(icc) = &meta.icc_profile else {
        return;
    };
    match encoder.set_icc_profile(icc.clone()) {
        Ok(()) => debug!(bytes = icc.len(), ?format, "ICC profile attached"),
        Err(err) => warn!(%err, ?format, "Encoder cannot embed an ICC profile; colour profile dropped"),
    }
}

/// `{output_dir}/{stem}{suffix}{.ext}`, keeping the input's extension.
pub fn output_path(input: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());
    let name = match input.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    output_dir.join(name)
}

/// EXIF tag value (1-8) for a decoded orientation.
fn exif_orientation(orientation: Orientation) -> u8 {
    #[allow(unreachable_patterns)]
    match orientation {
        Orientation::NoTransforms => 1,
        Orientation::FlipHorizontal => 2,
        Orientation::Rotate180 => 3,
        Orientation::FlipVertical => 4,
        Orientation::Rotate90FlipH => 5,
        Orientation::Rotate90 => 6,
        Orientation::Rotate270FlipH => 7,
        Orientation::Rotate270 => 8,
        _ => 1,
    }
}

fn decode_error(path: &Path, err: image::ImageError) -> RectifyError {
    match err {
        image::ImageError::Unsupported(e) => {
            RectifyError::UnsupportedFormat(format!("{}: {e}", path.display()))
        }
        other => RectifyError::ImageError(format!("failed to decode {}: {other}", path.display())),
    }
}

fn encode_error(err: image::ImageError) -> RectifyError {
    RectifyError::ImageError(format!("failed to encode image: {err}"))
}

fn tiff_error(err: tiff::TiffError) -> RectifyError {
    RectifyError::ImageError(format!("failed to encode TIFF: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::exif::{read_orientation, tests::sample_tiff};
    use image::Rgb;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 128]))
    }

    #[test]
    fn output_path_appends_suffix() {
        let out = output_path(Path::new("/in/receipt.JPG"), Path::new("/out"), "_rectified");
        assert_eq!(out, PathBuf::from("/out/receipt_rectified.JPG"));
        let bare = output_path(Path::new("scan"), Path::new("o"), "_x");
        assert_eq!(bare, PathBuf::from("o/scan_x"));
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/page.png");
        let img = gradient(30, 20);

        FsImageStore.save(&img, &ImageMeta::default(), &path, 95).expect("save");
        let (back, meta) = FsImageStore.load(&path).expect("load");
        assert_eq!(back, img);
        assert_eq!(meta.orientation, 1);
    }

    #[test]
    fn tiff_round_trip_is_lossless() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.tif");
        let img = gradient(17, 11);
        FsImageStore.save(&img, &ImageMeta::default(), &path, 95).expect("save");
        let (back, _) = FsImageStore.load(&path).expect("load");
        assert_eq!(back, img);
    }

    #[test]
    fn tiff_is_lzw_compressed_and_keeps_icc() {
        let img = RgbImage::from_fn(64, 64, |x, _| Rgb([(x / 8) as u8 * 30, 200, 200]));
        let icc: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let meta = ImageMeta {
            icc_profile: Some(icc.clone()),
            ..ImageMeta::default()
        };
        let bytes = encode(&img, &meta, SupportedFormat::Tiff, 95).expect("encode");
        assert!(bytes.len() < img.as_raw().len() / 4, "{} bytes", bytes.len());

        let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes.clone())).expect("decoder");
        let lzw = tiff::tags::CompressionMethod::LZW.to_u16();
        assert_eq!(decoder.get_tag_u32(Tag::Compression).expect("tag"), u32::from(lzw));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.tiff");
        fs::write(&path, bytes).expect("write");
        let (back, loaded) = FsImageStore.load(&path).expect("load");
        assert_eq!(back, img);
        assert_eq!(loaded.icc_profile, Some(icc));
    }

    #[test]
    fn unsupported_extension_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("page.bmp");
        let err = FsImageStore
            .save(&gradient(4, 4), &ImageMeta::default(), &path, 95)
            .expect_err("bmp is not accepted");
        assert!(matches!(err, RectifyError::UnsupportedFormat(_)));
        assert!(matches!(
            FsImageStore.load(&path),
            Err(RectifyError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FsImageStore
            .load(&dir.path().join("absent.jpg"))
            .expect_err("file does not exist");
        assert!(matches!(err, RectifyError::Io(_)));
    }

    /// A rotated camera JPEG loads upright and saves back with orientation 1.
    #[test]
    fn jpeg_orientation_applied_and_reset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("camera.jpg");

        let plain = encode(&gradient(40, 20), &ImageMeta::default(), SupportedFormat::Jpeg, 95)
            .expect("encode");
        let tagged = embed_in_jpeg(&plain, &sample_tiff(false, 6)).expect("embed");
        fs::write(&src, tagged).expect("write");

        let (upright, meta) = FsImageStore.load(&src).expect("load");
        assert_eq!(upright.dimensions(), (20, 40));
        assert_eq!(meta.orientation, 6);
        let exif = meta.exif.clone().expect("exif captured");
        assert_eq!(read_orientation(&exif).expect("parse"), Some(6));

        let dst = dir.path().join("out/camera_rectified.jpg");
        FsImageStore.save(&upright, &meta, &dst, 95).expect("save");
        let (reloaded, meta2) = FsImageStore.load(&dst).expect("reload");
        assert_eq!(reloaded.dimensions(), (20, 40));
        assert_eq!(meta2.orientation, 1);
        let exif2 = meta2.exif.expect("exif preserved");
        assert_eq!(read_orientation(&exif2).expect("parse"), Some(1));
    }

    #[test]
    fn jpeg_keeps_icc_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profiled.jpg");
        let icc: Vec<u8> = (0..=255u8).cycle().take(600).collect();
        let meta = ImageMeta {
            icc_profile: Some(icc.clone()),
            ..ImageMeta::default()
        };
        FsImageStore.save(&gradient(16, 16), &meta, &path, 90).expect("save");
        let (_, loaded) = FsImageStore.load(&path).expect("load");
        assert_eq!(loaded.icc_profile, Some(icc));
    }
}
