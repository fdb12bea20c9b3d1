use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Plot, PlotPoints, Points};

use crate::color::{normalize, price_ramp, TypeColors};
use crate::data::model::{PropertyType, Transaction};
use crate::data::stats::Histogram;

/// Colour buckets used for the map; one `Points` series each.
const MAP_COLOR_STEPS: usize = 10;
const KM_PER_DEGREE_LAT: f64 = 110.57;
const KM_PER_DEGREE_LON_AT_EQUATOR: f64 = 111.32;

// ---------------------------------------------------------------------------
// Price per m² distribution
// ---------------------------------------------------------------------------

/// Histogram of price per m², one stacked series per property type.
pub fn price_histogram(ui: &mut Ui, histogram: &Histogram, colors: &TypeColors) {
    let mut charts: Vec<BarChart> = Vec::new();
    for (property_type, counts) in &histogram.counts {
        let bars: Vec<Bar> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| Bar::new(histogram.bin_center(i), n as f64).width(histogram.bin_width))
            .collect();
        let chart = BarChart::new(bars)
            .name(property_type.to_string())
            .color(colors.color_for(*property_type));
        let refs: Vec<&BarChart> = charts.iter().collect();
        let chart = chart.stack_on(&refs);
        charts.push(chart);
    }

    Plot::new("price_histogram")
        .height(280.0)
        .legend(Legend::default())
        .x_axis_label("€ / m²")
        .y_axis_label("transactions")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Property type breakdown
// ---------------------------------------------------------------------------

/// One bar per property type, labelled with its share of the total.
pub fn type_breakdown(
    ui: &mut Ui,
    breakdown: &std::collections::BTreeMap<PropertyType, usize>,
    colors: &TypeColors,
) {
    let total: usize = breakdown.values().sum();

    Plot::new("type_breakdown")
        .height(280.0)
        .legend(Legend::default())
        .y_axis_label("transactions")
        .show_x(false)
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, (property_type, &count)) in breakdown.iter().enumerate() {
                let share = if total > 0 {
                    100.0 * count as f64 / total as f64
                } else {
                    0.0
                };
                let chart = BarChart::new(vec![Bar::new(i as f64, count as f64).width(0.6)])
                    .name(format!("{property_type} ({share:.0} %)"))
                    .color(colors.color_for(*property_type));
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

/// Scatter of the sampled transactions on a local equirectangular
/// projection (km from the sample centre), coloured by price per m².
pub fn transaction_map(ui: &mut Ui, sample: &[Transaction]) {
    let located: Vec<(f64, f64, f64)> = sample
        .iter()
        .filter_map(|t| t.coordinates().map(|(lat, lon)| (lat, lon, t.price_per_area)))
        .collect();
    if located.is_empty() {
        ui.label("No coordinates available for these transactions.");
        return;
    }

    let n = located.len() as f64;
    let lat0 = located.iter().map(|p| p.0).sum::<f64>() / n;
    let lon0 = located.iter().map(|p| p.1).sum::<f64>() / n;
    let km_per_lon = KM_PER_DEGREE_LON_AT_EQUATOR * lat0.to_radians().cos();
    let (min_ppa, max_ppa) = located.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, p| {
        (acc.0.min(p.2), acc.1.max(p.2))
    });

    let mut buckets: Vec<Vec<[f64; 2]>> = vec![Vec::new(); MAP_COLOR_STEPS];
    for &(lat, lon, ppa) in &located {
        let t = normalize(ppa, min_ppa, max_ppa);
        let i = ((t * MAP_COLOR_STEPS as f64) as usize).min(MAP_COLOR_STEPS - 1);
        buckets[i].push([(lon - lon0) * km_per_lon, (lat - lat0) * KM_PER_DEGREE_LAT]);
    }

    let step = (max_ppa - min_ppa) / MAP_COLOR_STEPS as f64;
    Plot::new("transaction_map")
        .height(420.0)
        .data_aspect(1.0)
        .legend(Legend::default())
        .x_axis_label("km east")
        .y_axis_label("km north")
        .show(ui, |plot_ui| {
            for (i, points) in buckets.into_iter().enumerate() {
                if points.is_empty() {
                    continue;
                }
                let lower = min_ppa + step * i as f64;
                let color = price_ramp((i as f64 + 0.5) / MAP_COLOR_STEPS as f64);
                plot_ui.points(
                    Points::new(PlotPoints::new(points))
                        .name(format!("≥ {lower:.0} €/m²"))
                        .color(color)
                        .radius(3.0),
                );
            }
        });
}
