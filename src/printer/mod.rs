//! Printer enumeration and print job submission.
//!
//! A job is one document holding one page with the bitmap drawn at its
//! native size at the origin. The device context is released when the
//! boxed context is dropped, on every path.

#[cfg(not(target_os = "windows"))]
mod cups;
#[cfg(target_os = "windows")]
mod gdi;

#[cfg(not(target_os = "windows"))]
pub use cups::CupsSpooler;
#[cfg(target_os = "windows")]
pub use gdi::GdiSpooler;

use image::{DynamicImage, ImageFormat};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Print errors
#[derive(Error, Debug)]
pub enum PrintError {
    #[error("Load a QR code first!")]
    NoImage,

    #[error("Select a printer!")]
    NoPrinter,

    #[error("Failed to enumerate printers: {0}")]
    Enumerate(String),

    #[error("Printer '{0}' could not be opened")]
    Open(String),

    #[error("{call} failed")]
    Device { call: &'static str },

    #[error("Print command failed: {0}")]
    Command(String),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A drawable printer target with document/page lifecycle calls
pub trait DeviceContext {
    fn start_doc(&mut self, title: &str) -> Result<(), PrintError>;
    fn start_page(&mut self) -> Result<(), PrintError>;
    fn draw_image(&mut self, image: &DynamicImage, x: i32, y: i32) -> Result<(), PrintError>;
    fn end_page(&mut self) -> Result<(), PrintError>;
    fn end_doc(&mut self) -> Result<(), PrintError>;
}

/// OS print spooler binding
pub trait PrintSpooler {
    /// Names of the registered printers, in spooler order
    fn printers(&self) -> Result<Vec<String>, PrintError>;

    /// Acquire a device context bound to the named printer
    fn open(&self, printer: &str) -> Result<Box<dyn DeviceContext>, PrintError>;
}

/// The spooler for the current platform
pub fn system_spooler() -> Box<dyn PrintSpooler> {
    #[cfg(target_os = "windows")]
    {
        Box::new(GdiSpooler)
    }

    #[cfg(not(target_os = "windows"))]
    {
        Box::new(CupsSpooler)
    }
}

/// Print `image` as a single page on `printer`.
///
/// Preconditions are checked before any device I/O. The bitmap is written
/// to a temporary PNG in `temp_dir` and read back for drawing; the file is
/// gone when this returns, whatever the outcome.
pub fn submit(
    spooler: &dyn PrintSpooler,
    image: Option<&DynamicImage>,
    printer: &str,
    title: &str,
    temp_dir: &Path,
) -> Result<(), PrintError> {
    let image = image.ok_or(PrintError::NoImage)?;
    if printer.is_empty() {
        return Err(PrintError::NoPrinter);
    }

    let mut file = tempfile::Builder::new()
        .prefix("qrprint-")
        .suffix(".png")
        .tempfile_in(temp_dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        image.write_to(&mut writer, ImageFormat::Png)?;
        writer.flush()?;
    }
    tracing::debug!("Print image written to {}", file.path().display());

    let page = image::open(file.path())?;
    tracing::info!(
        "Printing {}x{} image on '{}'",
        page.width(),
        page.height(),
        printer
    );

    let result = draw_single_page(spooler, printer, title, &page);

    file.close()?;
    result
}

fn draw_single_page(
    spooler: &dyn PrintSpooler,
    printer: &str,
    title: &str,
    page: &DynamicImage,
) -> Result<(), PrintError> {
    let mut dc = spooler.open(printer)?;
    dc.start_doc(title)?;
    dc.start_page()?;
    dc.draw_image(page, 0, 0)?;
    dc.end_page()?;
    dc.end_doc()?;
    Ok(())
}
