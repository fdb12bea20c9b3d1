use eframe::egui::{self, ScrollArea, Ui};

use crate::data::loader::SourceKey;
use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DvfDashboardApp {
    pub state: AppState,
}

impl DvfDashboardApp {
    /// Loads the whole department up front so the first frame has data.
    pub fn new(mut state: AppState) -> Self {
        state.select_source(SourceKey::All);
        Self { state }
    }
}

impl eframe::App for DvfDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: source + filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: indicators, charts, table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard(ui, &self.state);
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(view) = &state.view else {
        ui.centered_and_justified(|ui: &mut Ui| {
            let msg = state
                .status_message
                .as_deref()
                .unwrap_or("Open a file to view transactions  (File → Open…)");
            ui.heading(msg);
        });
        return;
    };

    let Some(stats) = &view.stats else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No transaction matches your filters.");
        });
        return;
    };

    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        ui.heading(format!("Key indicators – {}", state.source_label()));
        panels::indicators(ui, stats);
        ui.add_space(12.0);

        ui.columns(2, |cols| {
            cols[0].strong("Price per m² distribution");
            if let Some(histogram) = &view.histogram {
                plot::price_histogram(&mut cols[0], histogram, &state.type_colors);
            }
            cols[1].strong("Property types");
            plot::type_breakdown(&mut cols[1], &view.breakdown, &state.type_colors);
        });
        ui.add_space(12.0);

        ui.strong(format!(
            "Transaction map ({} sampled of {})",
            view.map_sample.len(),
            view.records.len()
        ));
        plot::transaction_map(ui, &view.map_sample);
        ui.add_space(12.0);

        ui.strong("Latest transactions");
        table::recent_transactions(ui, &view.recent);
    });
}
