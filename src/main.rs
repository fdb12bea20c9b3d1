mod app;
mod color;
mod config;
mod data;
mod error;
mod state;
mod ui;

use anyhow::Result;
use app::DvfDashboardApp;
use clap::Parser;
use eframe::egui;

use config::Args;
use data::catalog::CATALOG;
use data::store::DatasetStore;
use state::AppState;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    log::debug!("Catalog lists {} municipalities", CATALOG.len());
    for (name, codes) in CATALOG.duplicate_names() {
        log::warn!("Municipality catalog lists '{name}' under several codes: {codes:?}");
    }

    let store = DatasetStore::new(args.record_source()?);
    log::info!("Reading transactions from {}", store.describe_source());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "DVF Dashboard – Creuse",
        options,
        Box::new(|_cc| Ok(Box::new(DvfDashboardApp::new(AppState::new(store))))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
