//! PNG export of preview frames

use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::domain::errors::DomainError;
use crate::domain::model::{PreviewFrame, RasterImage};
use crate::error::StudioResult;

/// Save one raster as PNG
pub fn save_png(raster: &RasterImage, path: &Path) -> StudioResult<()> {
    let image = RgbImage::from_raw(raster.width, raster.height, raster.pixels.clone())
        .ok_or_else(|| {
            DomainError::CaptureError(format!(
                "{}x{} raster has {} bytes",
                raster.width,
                raster.height,
                raster.pixels.len()
            ))
        })?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Lay frames side by side in index order, as a timeline strip
pub fn contact_sheet(frames: &[PreviewFrame]) -> Option<RasterImage> {
    let first = frames.first()?;
    let (width, height) = (first.image.width, first.image.height);
    if frames
        .iter()
        .any(|f| f.image.width != width || f.image.height != height)
    {
        return None;
    }

    let mut ordered: Vec<&PreviewFrame> = frames.iter().collect();
    ordered.sort_by_key(|f| f.index);

    let columns = ordered.len() as u32;
    let mut sheet = RgbImage::new(width * columns, height);
    for (column, frame) in ordered.iter().enumerate() {
        let tile = RgbImage::from_raw(width, height, frame.image.pixels.clone())?;
        image::imageops::replace(&mut sheet, &tile, (column as u32 * width) as i64, 0);
    }

    Some(RasterImage {
        width: sheet.width(),
        height: sheet.height(),
        pixels: sheet.into_raw(),
    })
}
