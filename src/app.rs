//! Download and print orchestration.
//!
//! [`Orchestrator`] owns all application state: the loaded bitmap, its
//! preview, the printer list and the current selection. Every user action
//! runs to completion here and reports its outcome through a [`Notifier`].

use crate::browser::{self, BlobResolver, HeadlessBrowser};
use crate::config::{self, AppConfig, ConfigError, SettingsStore};
use crate::dialog::Notifier;
use crate::fetch::{self, Fetch, FetchError, HttpFetcher};
use crate::link::{Link, LinkError};
use crate::pdf::{self, PdfiumRasterizer, Rasterizer};
use crate::preview::Preview;
use crate::printer::{self, PrintError, PrintSpooler};
use image::DynamicImage;
use thiserror::Error;

const ERROR_TITLE: &str = "Error";
const SUCCESS_TITLE: &str = "Success";

/// Application errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// External collaborators
pub struct Services {
    pub fetcher: Box<dyn Fetch>,
    pub browser: Box<dyn BlobResolver>,
    pub rasterizer: Box<dyn Rasterizer>,
    pub spooler: Box<dyn PrintSpooler>,
}

impl Services {
    /// Real network, browser, PDFium and OS spooler
    pub fn system(config: &AppConfig) -> Self {
        Self {
            fetcher: Box::new(HttpFetcher::new(config.http_timeout)),
            browser: Box::new(HeadlessBrowser::new(config.browser_wait)),
            rasterizer: Box::new(PdfiumRasterizer::new(
                config.pdf_target_width,
                config.pdf_max_height,
            )),
            spooler: printer::system_spooler(),
        }
    }
}

pub struct Orchestrator {
    config: AppConfig,
    services: Services,
    notifier: Box<dyn Notifier>,
    store: SettingsStore,
    bitmap: Option<DynamicImage>,
    preview: Option<Preview>,
    printers: Vec<String>,
    selected_printer: Option<String>,
}

impl Orchestrator {
    /// Enumerate printers and restore the saved selection
    pub fn new(
        config: AppConfig,
        services: Services,
        notifier: Box<dyn Notifier>,
        store: SettingsStore,
    ) -> Self {
        let printers = services.spooler.printers().unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Vec::new()
        });
        tracing::info!("Found {} printers", printers.len());

        let saved = store.load().printer;
        let selected_printer = config::initial_printer(saved.as_deref(), &printers);
        if let Some(name) = &selected_printer {
            tracing::info!("Selected printer: {}", name);
        }

        Self {
            config,
            services,
            notifier,
            store,
            bitmap: None,
            preview: None,
            printers,
            selected_printer,
        }
    }

    pub fn bitmap(&self) -> Option<&DynamicImage> {
        self.bitmap.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn printers(&self) -> &[String] {
        &self.printers
    }

    pub fn selected_printer(&self) -> Option<&str> {
        self.selected_printer.as_deref()
    }

    /// Download action. Returns whether a new image was loaded.
    pub fn download(&mut self, raw: &str) -> bool {
        match self.try_download(raw) {
            Ok(()) => true,
            Err(AppError::Link(e)) => {
                tracing::warn!("{}", e);
                self.notifier.error(ERROR_TITLE, &e.to_string());
                false
            }
            Err(e) => {
                tracing::error!("Download failed: {}", e);
                let message = if raw.trim().starts_with("blob:") {
                    format!("Failed to load blob image: {}", e)
                } else {
                    format!("Failed to load image: {}", e)
                };
                self.notifier.error(ERROR_TITLE, &message);
                false
            }
        }
    }

    /// Retrieve and decode the linked image, replacing the current one
    /// only on success
    pub fn try_download(&mut self, raw: &str) -> Result<(), AppError> {
        let link = Link::parse(raw)?;
        tracing::info!("Downloading {} link: {}", link.kind(), link);

        let bitmap = self.acquire(&link)?;
        self.show(bitmap);
        Ok(())
    }

    fn acquire(&self, link: &Link) -> Result<DynamicImage, FetchError> {
        let fetcher = self.services.fetcher.as_ref();
        match link {
            Link::Direct(url) => fetch::decode_image(&fetcher.get(url)?),
            Link::Blob(url) => {
                let src = self.services.browser.resolve_image_src(url)?;
                let src = browser::absolute_src(url, &src)?;
                fetch::decode_image(&fetch::fetch_source(fetcher, &src)?)
            }
            Link::Pdf(url) => {
                let bytes = fetcher.get(url)?;
                pdf::rasterize_document(
                    self.services.rasterizer.as_ref(),
                    &bytes,
                    &self.config.temp_dir,
                )
            }
        }
    }

    fn show(&mut self, bitmap: DynamicImage) {
        self.preview = Some(Preview::from_bitmap(&bitmap, self.config.preview_edge));
        self.bitmap = Some(bitmap);
    }

    /// Print action. Returns whether the job was submitted.
    pub fn print(&mut self) -> bool {
        match self.try_print() {
            Ok(()) => {
                self.notifier.info(SUCCESS_TITLE, "QR code sent to the printer!");
                true
            }
            Err(e @ (PrintError::NoImage | PrintError::NoPrinter)) => {
                tracing::warn!("{}", e);
                self.notifier.error(ERROR_TITLE, &e.to_string());
                false
            }
            Err(e) => {
                tracing::error!("Printing failed: {}", e);
                self.notifier.error(ERROR_TITLE, &format!("Printing failed: {}", e));
                false
            }
        }
    }

    pub fn try_print(&self) -> Result<(), PrintError> {
        printer::submit(
            self.services.spooler.as_ref(),
            self.bitmap.as_ref(),
            self.selected_printer.as_deref().unwrap_or(""),
            &self.config.document_title,
            &self.config.temp_dir,
        )
    }

    /// Change the printer and persist the choice immediately
    pub fn select_printer(&mut self, name: String) {
        if let Err(e) = self.try_select_printer(name) {
            tracing::error!("{}", e);
            self.notifier.error(ERROR_TITLE, &e.to_string());
        }
    }

    /// The selection changes even when it cannot be saved
    pub fn try_select_printer(&mut self, name: String) -> Result<(), AppError> {
        tracing::info!("Printer selected: {}", name);
        let saved = self.store.save_printer(&name);
        self.selected_printer = Some(name);
        saved?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::testing::{RecordingNotifier, Shown};
    use crate::printer::testing::RecordingSpooler;
    use image::{GrayImage, ImageFormat, Luma};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([0])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    /// Serves canned bodies; unknown URLs fail with 404
    #[derive(Default)]
    struct StubFetcher {
        bodies: HashMap<String, Vec<u8>>,
    }

    impl StubFetcher {
        fn serving(url: &str, body: Vec<u8>) -> Self {
            let mut bodies = HashMap::new();
            bodies.insert(url.to_string(), body);
            Self { bodies }
        }
    }

    impl Fetch for StubFetcher {
        fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or(FetchError::Status { status: 404 })
        }
    }

    struct StubBrowser {
        src: Option<String>,
    }

    impl BlobResolver for StubBrowser {
        fn resolve_image_src(&self, _url: &str) -> Result<String, FetchError> {
            self.src
                .clone()
                .ok_or_else(|| FetchError::Browser("no image found".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingRasterizer {
        calls: Rc<Cell<usize>>,
    }

    impl Rasterizer for CountingRasterizer {
        fn rasterize_first_page(&self, path: &Path) -> Result<DynamicImage, FetchError> {
            assert!(path.exists());
            self.calls.set(self.calls.get() + 1);
            Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
                620,
                877,
                Luma([255]),
            )))
        }
    }

    struct Harness {
        app: Orchestrator,
        spooler: RecordingSpooler,
        notifier: RecordingNotifier,
        temp: TempDir,
        rasterized: Rc<Cell<usize>>,
    }

    fn harness(fetcher: StubFetcher, printers: &[&str], saved: Option<&str>) -> Harness {
        harness_with_browser(fetcher, StubBrowser { src: None }, printers, saved)
    }

    fn harness_with_browser(
        fetcher: StubFetcher,
        browser: StubBrowser,
        printers: &[&str],
        saved: Option<&str>,
    ) -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(temp.path().join("config.toml"));
        if let Some(name) = saved {
            store.save_printer(name).unwrap();
        }

        let work_dir = temp.path().join("work");
        std::fs::create_dir_all(&work_dir).unwrap();
        let config = AppConfig {
            temp_dir: work_dir,
            ..AppConfig::default()
        };

        let spooler = RecordingSpooler::with_printers(printers);
        let notifier = RecordingNotifier::default();
        let rasterizer = CountingRasterizer::default();
        let rasterized = rasterizer.calls.clone();

        let services = Services {
            fetcher: Box::new(fetcher),
            browser: Box::new(browser),
            rasterizer: Box::new(rasterizer),
            spooler: Box::new(spooler.clone()),
        };
        let app = Orchestrator::new(config, services, Box::new(notifier.clone()), store);

        Harness {
            app,
            spooler,
            notifier,
            temp,
            rasterized,
        }
    }

    fn work_dir_is_empty(h: &Harness) -> bool {
        std::fs::read_dir(h.temp.path().join("work")).unwrap().count() == 0
    }

    const QR_URL: &str = "https://example.com/qr.png";

    #[test]
    fn test_download_then_print_full_resolution() {
        let mut h = harness(
            StubFetcher::serving(QR_URL, png_bytes(330, 330)),
            &["Office"],
            None,
        );

        assert!(h.app.download(QR_URL));
        assert_eq!(h.app.preview().unwrap().dimensions(), (200, 200));
        assert_eq!(h.app.bitmap().unwrap().width(), 330);

        assert!(h.app.print());
        let calls = h.spooler.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("open:")).count(), 1);
        assert!(calls.contains(&"draw:330x330@0,0".to_string()));
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Info("QR code sent to the printer!".to_string())]
        );
        assert!(work_dir_is_empty(&h));
    }

    #[test]
    fn test_print_without_image() {
        let mut h = harness(StubFetcher::default(), &["Office"], None);

        assert!(!h.app.print());
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Error("Load a QR code first!".to_string())]
        );
        assert!(h.spooler.calls().is_empty());
    }

    #[test]
    fn test_print_without_printer() {
        let mut h = harness(StubFetcher::serving(QR_URL, png_bytes(50, 50)), &[], None);
        assert_eq!(h.app.selected_printer(), None);

        assert!(h.app.download(QR_URL));
        assert!(!h.app.print());
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Error("Select a printer!".to_string())]
        );
        assert!(h.spooler.calls().is_empty());
    }

    #[test]
    fn test_empty_link_rejected_before_io() {
        let mut h = harness(StubFetcher::default(), &[], None);

        assert!(!h.app.download("   "));
        assert_eq!(h.notifier.shown(), vec![Shown::Error("Enter a link!".to_string())]);
        assert!(h.app.bitmap().is_none());
    }

    #[test]
    fn test_failed_download_keeps_previous_image() {
        let mut h = harness(
            StubFetcher::serving(QR_URL, png_bytes(64, 48)),
            &["Office"],
            None,
        );
        assert!(h.app.download(QR_URL));

        assert!(!h.app.download("https://example.com/missing.png"));
        assert_eq!(h.app.bitmap().unwrap().width(), 64);
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Error("Failed to load image: HTTP error: 404".to_string())]
        );
    }

    #[test]
    fn test_undecodable_body_is_download_failure() {
        let mut h = harness(
            StubFetcher::serving(QR_URL, b"<html></html>".to_vec()),
            &[],
            None,
        );

        assert!(!h.app.download(QR_URL));
        assert!(h.app.bitmap().is_none());
        assert!(matches!(h.notifier.shown()[0], Shown::Error(_)));
    }

    #[test]
    fn test_pdf_first_page_only() {
        let url = "https://example.com/ticket.pdf";
        let mut h = harness(
            StubFetcher::serving(url, b"%PDF-1.7".to_vec()),
            &["Office"],
            None,
        );

        assert!(h.app.download(url));
        assert_eq!(h.rasterized.get(), 1);
        assert_eq!(h.app.bitmap().unwrap().height(), 877);
        assert!(work_dir_is_empty(&h));
    }

    #[test]
    fn test_blob_link_fetches_resolved_source() {
        let src = "https://cdn.example.com/generated.png";
        let mut h = harness_with_browser(
            StubFetcher::serving(src, png_bytes(90, 90)),
            StubBrowser {
                src: Some(src.to_string()),
            },
            &[],
            None,
        );

        assert!(h.app.download("blob:https://example.com/0c4e"));
        assert_eq!(h.app.bitmap().unwrap().width(), 90);
    }

    #[test]
    fn test_blob_relative_source_resolved_against_page() {
        let mut h = harness_with_browser(
            StubFetcher::serving("https://example.com/static/qr.png", png_bytes(72, 72)),
            StubBrowser {
                src: Some("/static/qr.png".to_string()),
            },
            &[],
            None,
        );

        assert!(h.app.download("blob:https://example.com/0c4e"));
        assert_eq!(h.app.bitmap().unwrap().width(), 72);
        assert!(h.notifier.shown().is_empty());
    }

    #[test]
    fn test_blob_failure_message() {
        let mut h = harness(StubFetcher::default(), &[], None);

        assert!(!h.app.download("blob:https://example.com/0c4e"));
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Error(
                "Failed to load blob image: Browser error: no image found".to_string()
            )]
        );
    }

    #[test]
    fn test_saved_printer_restored() {
        let h = harness(StubFetcher::default(), &["A", "X"], Some("X"));
        assert_eq!(h.app.selected_printer(), Some("X"));
    }

    #[test]
    fn test_saved_printer_gone_falls_back_to_first() {
        let h = harness(StubFetcher::default(), &["A", "B"], Some("X"));
        assert_eq!(h.app.selected_printer(), Some("A"));
    }

    #[test]
    fn test_selection_persists_across_restart() {
        let mut h = harness(StubFetcher::default(), &["A", "X"], None);
        assert_eq!(h.app.selected_printer(), Some("A"));

        h.app.select_printer("X".to_string());

        let store = SettingsStore::new(h.temp.path().join("config.toml"));
        let services = Services {
            fetcher: Box::new(StubFetcher::default()),
            browser: Box::new(StubBrowser { src: None }),
            rasterizer: Box::new(CountingRasterizer::default()),
            spooler: Box::new(RecordingSpooler::with_printers(&["A", "X"])),
        };
        let restarted = Orchestrator::new(
            AppConfig::default(),
            services,
            Box::new(RecordingNotifier::default()),
            store,
        );
        assert_eq!(restarted.selected_printer(), Some("X"));
    }

    #[test]
    fn test_unwritable_settings_reported() {
        let mut h = harness(StubFetcher::default(), &["A", "X"], None);
        h.app.store = SettingsStore::new(h.temp.path());

        let err = h.app.try_select_printer("X".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Io(_))));
        assert_eq!(h.app.selected_printer(), Some("X"));

        h.app.select_printer("A".to_string());
        assert_eq!(h.app.selected_printer(), Some("A"));
        match &h.notifier.shown()[..] {
            [Shown::Error(message)] => {
                assert!(message.starts_with("Failed to access settings file"))
            }
            other => panic!("unexpected dialogs: {:?}", other),
        }
    }

    #[test]
    fn test_device_failure_reported() {
        let mut h = harness(
            StubFetcher::serving(QR_URL, png_bytes(40, 40)),
            &["Office"],
            None,
        );
        h.app.services.spooler = Box::new(RecordingSpooler {
            fail_on: Some("StartDoc"),
            ..RecordingSpooler::with_printers(&["Office"])
        });

        assert!(h.app.download(QR_URL));
        assert!(!h.app.print());
        assert_eq!(
            h.notifier.shown(),
            vec![Shown::Error("Printing failed: StartDoc failed".to_string())]
        );
        assert!(work_dir_is_empty(&h));
    }
}
