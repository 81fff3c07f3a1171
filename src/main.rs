use clap::Parser;
use iced::Size;
use qrprint::config::{AppConfig, SettingsStore};
use qrprint::ui::{QrPrinterApp, WINDOW_HEIGHT, WINDOW_WIDTH};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "Download a QR code from a link and print it")]
struct Args {
    /// Settings file (default: <config dir>/qrprint/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

pub fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = SettingsStore::new(args.config.unwrap_or_else(SettingsStore::default_path));
    tracing::info!("Using settings file {}", store.path().display());
    let config = AppConfig::default();

    iced::application(
        move || QrPrinterApp::new(config.clone(), store.clone()),
        QrPrinterApp::update,
        QrPrinterApp::view,
    )
    .title("QR Printer App")
    .window_size(Size::new(WINDOW_WIDTH, WINDOW_HEIGHT))
    .subscription(QrPrinterApp::subscription)
    .run()?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise info, or debug with `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("qrprint={}", level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
