//! Thumbnail preview

use iced::widget::image::Handle;
use image::DynamicImage;
use image::imageops::FilterType;

/// Edge length of the square preview box
pub const PREVIEW_EDGE: u32 = 200;

/// A downsampled copy of the loaded bitmap, ready for display
#[derive(Debug, Clone)]
pub struct Preview {
    handle: Handle,
    width: u32,
    height: u32,
}

impl Preview {
    pub fn from_bitmap(bitmap: &DynamicImage, edge: u32) -> Self {
        let rgba = thumbnail(bitmap, edge).to_rgba8();
        let (width, height) = rgba.dimensions();

        Self {
            handle: Handle::from_rgba(width, height, rgba.into_raw()),
            width,
            height,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Resize to an `edge`×`edge` box with Lanczos3 filtering
pub fn thumbnail(bitmap: &DynamicImage, edge: u32) -> DynamicImage {
    tracing::debug!(
        orig_w = bitmap.width(),
        orig_h = bitmap.height(),
        edge,
        "Resizing preview"
    );
    bitmap.resize_exact(edge, edge, FilterType::Lanczos3)
}
