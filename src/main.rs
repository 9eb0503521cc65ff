#![deny(dead_code)] // DO NOT REMOVE THIS EVER
use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

mod ui;

use crate::ui::{DashboardUI, UiCommand};
use gateboard::config::{self, GatewayConfig};
use gateboard::notify::ToastQueue;
use gateboard::pairing::{MockTransport, PairingController, PairingTransport};
use gateboard::routes::Route;
use gateboard::utils;

/// Command line arguments for gateboard
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "gateboard: a terminal dashboard for a WhatsApp-style messaging gateway.",
    long_about = "gateboard manages gateway devices, contacts, messages and campaigns from the terminal.\n\n\
    Devices are paired by scanning a QR code shown in the pairing dialog.\n\
    Use -h or --help to see all options."
)]
struct Args {
    /// Path to the JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the log here instead of gateboard.log
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Overrides the configured log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Page to open first, e.g. /devices
    #[arg(long, value_name = "ROUTE", default_value = "/")]
    page: String,
}

/// Pairing dialog currently on screen
struct PairingModal {
    controller: PairingController,
    device_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.config {
        config::set_config_path_override(path.clone());
    }
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            GatewayConfig::default()
        }
    };

    let level = match &args.log_level {
        Some(level) => LevelFilter::from_str(level).unwrap_or(LevelFilter::Info),
        None => config.log_level_filter().unwrap_or(LevelFilter::Info),
    };
    let log_file = args
        .log_file
        .clone()
        .or_else(|| config.log_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(utils::DEFAULT_LOG_FILE));
    utils::setup_logging(log_file.to_str(), level)?;

    info!("gateboard starting up");
    info!("System information: {} {}", std::env::consts::OS, std::env::consts::ARCH);
    info!("Logging to file: {}", log_file.display());
    debug!("Effective config: {:?}", config);

    let route = Route::from_path(&args.page);
    if route == Route::NotFound {
        warn!("Unknown start page {}", args.page);
    }

    let toasts = ToastQueue::default();
    let transport: Arc<dyn PairingTransport> = Arc::new(MockTransport::new(config.mock_options()));

    let mut terminal = ui::setup_terminal()?;
    let mut dashboard = DashboardUI::new(route, toasts.clone());

    let result = run_main_loop(&mut dashboard, &mut terminal, transport, toasts, &config).await;

    ui::restore_terminal(terminal)?;
    match &result {
        Ok(()) => info!("gateboard exiting from page {}", dashboard.route().path()),
        Err(e) => error!("gateboard exiting on error: {}", e),
    }
    result
}

/// Run the main event loop
async fn run_main_loop(
    dashboard: &mut DashboardUI,
    terminal: &mut ui::Terminal<ui::CrosstermBackend<io::Stdout>>,
    transport: Arc<dyn PairingTransport>,
    toasts: ToastQueue,
    config: &GatewayConfig,
) -> Result<()> {
    // Completion callbacks report the paired device id here
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<String>();
    let mut modal: Option<PairingModal> = None;

    loop {
        if let Some(open) = modal.as_mut() {
            open.controller.poll_events();
            dashboard.set_pairing(Some(open.controller.snapshot()));
        }

        terminal.draw(|f| dashboard.draw(f))?;

        dashboard.clean_toasts(config.toast_timeout_secs);

        if let Ok(device_id) = done_rx.try_recv() {
            if modal.as_ref().map(|m| m.device_id == device_id).unwrap_or(false) {
                info!("Pairing for device {} settled, closing dialog", device_id);
                close_modal(&mut modal, dashboard);
            }
        }

        let Some(command) = dashboard.handle_input()? else {
            continue;
        };

        match command {
            UiCommand::Quit => {
                close_modal(&mut modal, dashboard);
                break;
            }
            UiCommand::OpenPairing { device_id, device_name } => {
                // one dialog at a time
                close_modal(&mut modal, dashboard);
                let mut controller = PairingController::new(
                    transport.clone(),
                    Arc::new(toasts.clone()),
                    config.pairing_options(),
                );
                let tx = done_tx.clone();
                let id = device_id.clone();
                let transition = controller
                    .open(Some(&device_id), &device_name, move || {
                        let _ = tx.send(id);
                    })
                    .await;
                debug!("Open pairing for {}: {:?}", device_id, transition);
                dashboard.set_pairing(Some(controller.snapshot()));
                modal = Some(PairingModal { controller, device_id });
            }
            UiCommand::RefreshPairing => {
                if let Some(open) = modal.as_mut() {
                    let transition = open.controller.refresh().await;
                    debug!("Refresh pairing for {}: {:?}", open.device_id, transition);
                }
            }
            UiCommand::ClosePairing => close_modal(&mut modal, dashboard),
        }
    }

    Ok(())
}

fn close_modal(modal: &mut Option<PairingModal>, dashboard: &mut DashboardUI) {
    if let Some(mut open) = modal.take() {
        open.controller.close();
        debug!("Closed pairing dialog for device {}", open.device_id);
    }
    if dashboard.pairing_open() {
        dashboard.set_pairing(None);
    }
}
