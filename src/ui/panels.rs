use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use super::format_thousands;
use crate::data::catalog::CATALOG;
use crate::data::filter::TypeChoice;
use crate::data::loader::{LocalFileSource, SourceKey};
use crate::data::stats::SummaryStats;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – source and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Municipality");
    ui.separator();
    source_selector(ui, state);
    ui.add_space(8.0);

    ui.heading("Filters");
    ui.separator();

    let Some(dataset) = state.dataset() else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the widgets.
    let names: Vec<String> = dataset.municipality_names.iter().cloned().collect();
    let postal_codes: Vec<String> = dataset.postal_codes.iter().cloned().collect();
    let (_, max_bound) = state.price_bounds();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if names.len() > 1 {
                let header = format!(
                    "Municipalities  ({}/{})",
                    state.selection.municipalities.len(),
                    names.len()
                );
                egui::CollapsingHeader::new(RichText::new(header).strong())
                    .id_salt("municipalities")
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all_municipalities();
                            }
                            if ui.small_button("None").clicked() {
                                state.select_no_municipalities();
                            }
                        });
                        for name in &names {
                            let mut checked = state.selection.municipalities.contains(name);
                            let mut response = ui.checkbox(&mut checked, name.as_str());
                            let codes = CATALOG.codes_of(name);
                            if !codes.is_empty() {
                                response = response.on_hover_text(codes.join(", "));
                            }
                            if response.changed() {
                                state.toggle_municipality(name);
                            }
                        }
                    });
            }

            let header = format!(
                "Postal code  ({}/{})",
                state.selection.postal_codes.len(),
                postal_codes.len()
            );
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("postal_codes")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.select_all_postal_codes();
                        }
                        if ui.small_button("None").clicked() {
                            state.select_no_postal_codes();
                        }
                    });
                    for code in &postal_codes {
                        let mut checked = state.selection.postal_codes.contains(code);
                        if ui.checkbox(&mut checked, code.as_str()).changed() {
                            state.toggle_postal_code(code);
                        }
                    }
                });
            ui.separator();

            ui.strong("Property type");
            let current = state.selection.property_type;
            egui::ComboBox::from_id_salt("property_type")
                .selected_text(current.to_string())
                .show_ui(ui, |ui: &mut Ui| {
                    for choice in TypeChoice::OPTIONS {
                        if ui
                            .selectable_label(current == choice, choice.to_string())
                            .clicked()
                        {
                            state.set_property_type(choice);
                        }
                    }
                });
            ui.separator();

            ui.strong("Price (€)");
            let mut min_price = state.selection.min_price;
            let mut max_price = state.selection.max_price;
            let mut changed = false;
            ui.horizontal(|ui: &mut Ui| {
                ui.label("min");
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut min_price)
                            .speed(10_000.0)
                            .range(0.0..=max_bound),
                    )
                    .changed();
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("max");
                changed |= ui
                    .add(
                        egui::DragValue::new(&mut max_price)
                            .speed(10_000.0)
                            .range(0.0..=max_bound),
                    )
                    .changed();
            });
            if changed {
                state.set_price_range(min_price, max_price);
            }
            ui.separator();

            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

/// "All municipalities" followed by every catalogued code, by name.
fn source_selector(ui: &mut Ui, state: &mut AppState) {
    let mut entries: Vec<(String, SourceKey)> = CATALOG
        .codes()
        .filter_map(|code| {
            let name = CATALOG.name_of(code)?;
            Some((format!("{name} ({code})"), SourceKey::Municipality(code.to_string())))
        })
        .collect();
    entries.sort();
    entries.insert(0, ("All municipalities".to_string(), SourceKey::All));

    let mut picked = None;
    egui::ComboBox::from_id_salt("source_key")
        .selected_text(state.source_label())
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for (label, key) in &entries {
                if ui
                    .selectable_label(state.source_key == *key, label.as_str())
                    .clicked()
                {
                    picked = Some(key.clone());
                }
            }
        });
    if let Some(key) = picked {
        if key != state.source_key || state.outcome.is_none() {
            state.select_source(key);
        }
    }
}

// ---------------------------------------------------------------------------
// Key indicators
// ---------------------------------------------------------------------------

/// Four tiles: mean €/m², median price, count, mean surface.
pub fn indicators(ui: &mut Ui, stats: &SummaryStats) {
    let tiles = [
        ("Mean price / m²", format!("{} €", format_thousands(stats.mean_price_per_area))),
        ("Median price", format!("{} €", format_thousands(stats.median_value))),
        ("Transactions", format_thousands(stats.count as f64)),
        ("Mean surface", format!("{} m²", format_thousands(stats.mean_built_area))),
    ];
    ui.columns(tiles.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(tiles) {
            col.group(|ui: &mut Ui| {
                ui.label(label);
                ui.heading(value);
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(state.store.describe_source());
        ui.separator();

        if let (Some(ds), Some(view)) = (state.dataset(), &state.view) {
            ui.label(format!(
                "{} transactions loaded, {} visible",
                ds.len(),
                view.records.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open transaction data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.set_source(Box::new(LocalFileSource::new(path)));
        match state.dataset() {
            Some(ds) => log::info!("Loaded {} clean transactions", ds.len()),
            None => log::error!(
                "No usable data: {}",
                state.status_message.as_deref().unwrap_or("empty result")
            ),
        }
    }
}
