use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use super::format_thousands;
use crate::data::model::Transaction;

const HEADERS: [&str; 7] = [
    "Date",
    "Municipality",
    "Postal code",
    "Type",
    "Price (€)",
    "Surface (m²)",
    "€ / m²",
];

/// The most recent transactions, newest first.
pub fn recent_transactions(ui: &mut Ui, rows: &[Transaction]) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .resizable(true)
        .column(Column::auto())
        .column(Column::remainder().at_least(120.0))
        .columns(Column::auto(), HEADERS.len() - 2)
        .header(20.0, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, rows.len(), |mut row| {
                let t = &rows[row.index()];
                row.col(|ui| {
                    ui.label(t.mutation_date.format("%Y-%m-%d").to_string());
                });
                row.col(|ui| {
                    let name = t.municipality_name.as_deref().unwrap_or(&t.municipality_code);
                    ui.label(name);
                });
                row.col(|ui| {
                    ui.label(t.postal_code.as_str());
                });
                row.col(|ui| {
                    ui.label(t.property_type.to_string());
                });
                row.col(|ui| {
                    ui.label(format_thousands(t.value));
                });
                row.col(|ui| {
                    ui.label(format!("{:.0}", t.built_area));
                });
                row.col(|ui| {
                    ui.label(format_thousands(t.price_per_area));
                });
            });
        });
}
