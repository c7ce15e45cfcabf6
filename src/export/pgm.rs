//! Greyscale image of the synthetic intensity field
//!
//! Binary PGM (P5), one byte per pixel, time left to right and frequency top
//! to bottom. Written with the same temp-then-rename pattern as the report.

use crate::error::{BatcallError, Result};
use crate::presenter::IntensityField;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{GrayImage, ImageError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Write `field` as a binary PGM image
pub fn write_pgm(field: &IntensityField, output_path: &Path) -> Result<()> {
    let image = to_image(field).ok_or_else(|| BatcallError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!(
            "Cannot build a {}x{} image from the intensity field",
            field.width(),
            field.height()
        ),
    })?;

    // Same directory keeps the rename on one filesystem
    let temp_path = output_path.with_extension("pgm.tmp");
    let written = encode_to(&image, &temp_path).and_then(|()| {
        std::fs::rename(&temp_path, output_path).map_err(ImageError::IoError)
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(match e {
            ImageError::IoError(io) => BatcallError::output_error(output_path, io),
            other => BatcallError::OutputError {
                path: output_path.to_path_buf(),
                reason: format!("Failed to encode image: {}", other),
            },
        });
    }

    info!(
        "Wrote {}x{} intensity field to {}",
        image.width(),
        image.height(),
        output_path.display()
    );
    Ok(())
}

/// `None` for an empty field or one too large for the image dimensions
fn to_image(field: &IntensityField) -> Option<GrayImage> {
    if field.width() == 0 || field.height() == 0 {
        return None;
    }
    let width = u32::try_from(field.width()).ok()?;
    let height = u32::try_from(field.height()).ok()?;
    GrayImage::from_raw(width, height, field.to_gray_rows())
}

fn encode_to(image: &GrayImage, path: &Path) -> std::result::Result<(), ImageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let encoder = PnmEncoder::new(&mut writer)
        .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary));
    image.write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}
