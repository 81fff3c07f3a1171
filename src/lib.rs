//! qrprint - download a QR code image from a link, preview it and print it
//!
//! Links are classified by shape: `blob:` links are resolved in a headless
//! browser, `.pdf` links have their first page rasterized, and anything else
//! is fetched directly. The loaded image is shown as a 200×200 thumbnail and
//! printed at full resolution on the selected printer, whose name is
//! remembered between runs.

pub mod app;
pub mod browser;
pub mod config;
pub mod dialog;
pub mod fetch;
pub mod input;
pub mod link;
pub mod pdf;
pub mod preview;
pub mod printer;
pub mod ui;

pub use app::{AppError, Orchestrator, Services};
pub use link::Link;
pub use ui::QrPrinterApp;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{AppError, Orchestrator, Services};
    pub use crate::config::{AppConfig, Settings, SettingsStore};
    pub use crate::dialog::Notifier;
    pub use crate::fetch::Fetch;
    pub use crate::link::Link;
    pub use crate::printer::{DeviceContext, PrintSpooler};
    pub use crate::ui::QrPrinterApp;
}
