//! CUPS spooler via the `lpstat` / `lp` command line tools

use super::{DeviceContext, PrintError, PrintSpooler};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::process::Command;

pub struct CupsSpooler;

impl PrintSpooler for CupsSpooler {
    fn printers(&self) -> Result<Vec<String>, PrintError> {
        let output = Command::new("lpstat")
            .arg("-e")
            .output()
            .map_err(|e| PrintError::Enumerate(format!("lpstat: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintError::Enumerate(stderr.trim().to_string()));
        }

        Ok(parse_printer_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn open(&self, printer: &str) -> Result<Box<dyn DeviceContext>, PrintError> {
        Ok(Box::new(CupsContext {
            printer: printer.to_string(),
            title: None,
            page: None,
            pages: Vec::new(),
        }))
    }
}

fn parse_printer_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Page being drawn: images and their origins
type PageOps = Vec<(DynamicImage, i32, i32)>;

/// Collects drawn pages; submits them with `lp` at end of document.
struct CupsContext {
    printer: String,
    title: Option<String>,
    page: Option<PageOps>,
    pages: Vec<RgbaImage>,
}

impl DeviceContext for CupsContext {
    fn start_doc(&mut self, title: &str) -> Result<(), PrintError> {
        if self.title.is_some() {
            return Err(PrintError::Device { call: "StartDoc" });
        }
        self.title = Some(title.to_string());
        Ok(())
    }

    fn start_page(&mut self) -> Result<(), PrintError> {
        if self.title.is_none() || self.page.is_some() {
            return Err(PrintError::Device { call: "StartPage" });
        }
        self.page = Some(Vec::new());
        Ok(())
    }

    fn draw_image(&mut self, image: &DynamicImage, x: i32, y: i32) -> Result<(), PrintError> {
        let page = self
            .page
            .as_mut()
            .ok_or(PrintError::Device { call: "Draw" })?;
        page.push((image.clone(), x, y));
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), PrintError> {
        let ops = self.page.take().ok_or(PrintError::Device { call: "EndPage" })?;
        self.pages.push(compose_page(&ops));
        Ok(())
    }

    fn end_doc(&mut self) -> Result<(), PrintError> {
        let title = self.title.take().ok_or(PrintError::Device { call: "EndDoc" })?;

        for page in self.pages.drain(..) {
            let file = tempfile::Builder::new()
                .prefix("qrprint-page-")
                .suffix(".png")
                .tempfile()?;
            page.save_with_format(file.path(), ImageFormat::Png)?;

            let output = Command::new("lp")
                .args(["-d", self.printer.as_str(), "-t", title.as_str()])
                .arg(file.path())
                .output()
                .map_err(|e| PrintError::Command(format!("lp: {}", e)))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(PrintError::Command(stderr.trim().to_string()));
            }

            tracing::info!(
                "Submitted page to '{}': {}",
                self.printer,
                String::from_utf8_lossy(&output.stdout).trim()
            );
            file.close()?;
        }
        Ok(())
    }
}

/// Flatten drawn images onto a white canvas covering their extents
fn compose_page(ops: &PageOps) -> RgbaImage {
    let width = ops
        .iter()
        .map(|(img, x, _)| (*x).max(0) as u32 + img.width())
        .max()
        .unwrap_or(1);
    let height = ops
        .iter()
        .map(|(img, _, y)| (*y).max(0) as u32 + img.height())
        .max()
        .unwrap_or(1);

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for (img, x, y) in ops {
        image::imageops::overlay(&mut canvas, &img.to_rgba8(), i64::from(*x), i64::from(*y));
    }
    canvas
}
