//! PDF rasterization

use crate::fetch::FetchError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::Path;

/// Initialize the PDFium library
pub fn init_pdfium() -> Result<Pdfium, PdfiumError> {
    let lib_name = if cfg!(target_os = "windows") {
        "pdfium.dll"
    } else {
        "libpdfium.so"
    };

    let bindings = Pdfium::bind_to_library(format!("./{}", lib_name))
        .or_else(|_| Pdfium::bind_to_library(format!("/usr/lib/{}", lib_name)))
        .or_else(|_| Pdfium::bind_to_system_library())?;

    Ok(Pdfium::new(bindings))
}

/// Renders the first page of a document on disk
pub trait Rasterizer {
    fn rasterize_first_page(&self, path: &Path) -> Result<DynamicImage, FetchError>;
}

/// PDFium-backed rasterizer.
///
/// The library is bound per call so a missing PDFium only breaks the
/// document path, not application startup.
pub struct PdfiumRasterizer {
    target_width: i32,
    max_height: i32,
}

impl PdfiumRasterizer {
    pub fn new(target_width: i32, max_height: i32) -> Self {
        Self {
            target_width,
            max_height,
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize_first_page(&self, path: &Path) -> Result<DynamicImage, FetchError> {
        let pdfium = init_pdfium().map_err(|e| {
            tracing::error!("Failed to load PDFium: {}", e);
            FetchError::Document(format!("PDFium unavailable: {}", e))
        })?;

        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| FetchError::Document(format!("could not open document: {}", e)))?;

        let pages = document.pages();
        tracing::debug!("Document has {} pages, rendering the first", pages.len());

        let page = pages
            .get(0)
            .map_err(|_| FetchError::Document("document has no pages".to_string()))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.target_width)
            .set_maximum_height(self.max_height)
            .rotate_if_landscape(PdfPageRenderRotation::None, true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| FetchError::Document(format!("render failed: {}", e)))?;

        Ok(DynamicImage::ImageRgba8(bitmap.as_image().to_rgba8()))
    }
}

/// Spool downloaded document bytes to a temporary `.pdf` file in `temp_dir`
/// and rasterize its first page. The file is removed before returning.
pub fn rasterize_document(
    rasterizer: &dyn Rasterizer,
    bytes: &[u8],
    temp_dir: &Path,
) -> Result<DynamicImage, FetchError> {
    let mut file = tempfile::Builder::new()
        .prefix("qrprint-")
        .suffix(".pdf")
        .tempfile_in(temp_dir)?;
    file.write_all(bytes)?;
    file.flush()?;

    tracing::debug!("Spooled {} document bytes to {}", bytes.len(), file.path().display());
    let page = rasterizer.rasterize_first_page(file.path());

    file.close()?;
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingRasterizer {
        seen: RefCell<Vec<(PathBuf, Vec<u8>)>>,
        fail: bool,
    }

    impl Rasterizer for RecordingRasterizer {
        fn rasterize_first_page(&self, path: &Path) -> Result<DynamicImage, FetchError> {
            let contents = std::fs::read(path)?;
            self.seen.borrow_mut().push((path.to_path_buf(), contents));
            if self.fail {
                return Err(FetchError::Document("document has no pages".to_string()));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                10,
                14,
                Rgba([255, 255, 255, 255]),
            )))
        }
    }

    #[test]
    fn test_document_spooled_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = RecordingRasterizer::default();

        let page = rasterize_document(&rasterizer, b"%PDF-1.4 fake", dir.path()).unwrap();
        assert_eq!((page.width(), page.height()), (10, 14));

        let seen = rasterizer.seen.borrow();
        assert_eq!(seen.len(), 1);
        let (path, contents) = &seen[0];
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(contents.as_slice(), b"%PDF-1.4 fake");
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_document_removed_on_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = RecordingRasterizer {
            fail: true,
            ..Default::default()
        };

        let err = rasterize_document(&rasterizer, b"%PDF-1.4", dir.path()).unwrap_err();
        assert!(matches!(err, FetchError::Document(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
