use std::collections::BTreeMap;

use rand::Rng;

use super::filter::{apply, FilterSelection};
use super::model::{PropertyType, Transaction, TransactionDataset};

/// Most rows the map is given.
pub const MAP_SAMPLE_CAP: usize = 5000;
/// Rows in the recent-transactions table.
pub const RECENT_ROWS: usize = 100;
/// Bins of the price-per-m² histogram.
pub const HISTOGRAM_BINS: usize = 50;

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// The four key indicators over a filtered subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub mean_price_per_area: f64,
    pub median_value: f64,
    pub count: usize,
    pub mean_built_area: f64,
}

/// `None` when there is nothing to summarise.
pub fn summarize(rows: &[&Transaction]) -> Option<SummaryStats> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let mean_price_per_area = rows.iter().map(|t| t.price_per_area).sum::<f64>() / n;
    let mean_built_area = rows.iter().map(|t| t.built_area).sum::<f64>() / n;

    let mut values: Vec<f64> = rows.iter().map(|t| t.value).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    let median_value = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };

    Some(SummaryStats {
        mean_price_per_area,
        median_value,
        count: rows.len(),
        mean_built_area,
    })
}

// ---------------------------------------------------------------------------
// Map sample / recent table
// ---------------------------------------------------------------------------

/// Uniform sample without replacement, capped at `cap`, in the original
/// order. Sets no larger than `cap` come back whole.
pub fn map_sample<'a, R: Rng + ?Sized>(
    rows: &[&'a Transaction],
    cap: usize,
    rng: &mut R,
) -> Vec<&'a Transaction> {
    if rows.len() <= cap {
        return rows.to_vec();
    }
    let mut picked = rand::seq::index::sample(rng, rows.len(), cap).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| rows[i]).collect()
}

/// The `limit` most recent rows, newest first; equal dates keep input order.
pub fn most_recent<'a>(rows: &[&'a Transaction], limit: usize) -> Vec<&'a Transaction> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| b.mutation_date.cmp(&a.mutation_date));
    sorted.truncate(limit);
    sorted
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// Equal-width price-per-m² bins, counts split by property type.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub min: f64,
    pub bin_width: f64,
    pub counts: BTreeMap<PropertyType, Vec<usize>>,
}

impl Histogram {
    /// Centre of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        self.min + (i as f64 + 0.5) * self.bin_width
    }
}

pub fn price_histogram(rows: &[&Transaction], bins: usize) -> Option<Histogram> {
    if rows.is_empty() || bins == 0 {
        return None;
    }
    let min = rows.iter().map(|t| t.price_per_area).fold(f64::INFINITY, f64::min);
    let max = rows
        .iter()
        .map(|t| t.price_per_area)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let bin_width = if span > 0.0 { span / bins as f64 } else { 1.0 };

    let mut counts: BTreeMap<PropertyType, Vec<usize>> = BTreeMap::new();
    for t in rows {
        let i = (((t.price_per_area - min) / bin_width) as usize).min(bins - 1);
        counts.entry(t.property_type).or_insert_with(|| vec![0; bins])[i] += 1;
    }
    Some(Histogram {
        min,
        bin_width,
        counts,
    })
}

/// Transaction count per property type.
pub fn type_breakdown(rows: &[&Transaction]) -> BTreeMap<PropertyType, usize> {
    let mut counts = BTreeMap::new();
    for t in rows {
        *counts.entry(t.property_type).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// FilteredView – everything the presentation layer draws
// ---------------------------------------------------------------------------

/// One recomputation pass of the engine, owning copies of the rows so the
/// view outlives any borrow of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub records: Vec<Transaction>,
    /// `None` means no data for the current selection.
    pub stats: Option<SummaryStats>,
    pub map_sample: Vec<Transaction>,
    pub recent: Vec<Transaction>,
    pub histogram: Option<Histogram>,
    pub breakdown: BTreeMap<PropertyType, usize>,
}

impl FilteredView {
    pub fn compute<R: Rng + ?Sized>(
        dataset: &TransactionDataset,
        selection: &FilterSelection,
        rng: &mut R,
    ) -> Self {
        let rows = apply(dataset, selection);
        let owned = |v: Vec<&Transaction>| v.into_iter().cloned().collect::<Vec<_>>();

        FilteredView {
            stats: summarize(&rows),
            map_sample: owned(map_sample(&rows, MAP_SAMPLE_CAP, rng)),
            recent: owned(most_recent(&rows, RECENT_ROWS)),
            histogram: price_histogram(&rows, HISTOGRAM_BINS),
            breakdown: type_breakdown(&rows),
            records: owned(rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tx(day: u32, value: f64, area: f64, kind: PropertyType) -> Transaction {
        Transaction {
            mutation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(day as u64),
            value,
            built_area: area,
            property_type: kind,
            postal_code: "23000".to_string(),
            municipality_code: "23096".to_string(),
            municipality_name: None,
            latitude: Some(46.0 + day as f64 * 1e-4),
            longitude: Some(1.8),
            price_per_area: value / area,
        }
    }

    fn many(n: usize) -> Vec<Transaction> {
        (0..n)
            .map(|i| tx((i % 300) as u32, 50_000.0 + i as f64, 50.0, PropertyType::House))
            .collect()
    }

    #[test]
    fn summary_of_known_rows() {
        let rows = [
            tx(0, 80_000.0, 40.0, PropertyType::House),
            tx(1, 100_000.0, 50.0, PropertyType::House),
            tx(2, 300_000.0, 100.0, PropertyType::Apartment),
            tx(3, 120_000.0, 30.0, PropertyType::Apartment),
        ];
        let refs: Vec<&Transaction> = rows.iter().collect();
        let s = summarize(&refs).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.median_value, 110_000.0);
        assert_eq!(s.mean_built_area, 55.0);
        assert_eq!(s.mean_price_per_area, (2000.0 + 2000.0 + 3000.0 + 4000.0) / 4.0);

        let s = summarize(&refs[..3]).unwrap();
        assert_eq!(s.median_value, 100_000.0);
    }

    #[test]
    fn no_statistics_without_rows() {
        assert_eq!(summarize(&[]), None);
        assert_eq!(price_histogram(&[], HISTOGRAM_BINS), None);
        assert!(type_breakdown(&[]).is_empty());
    }

    #[test]
    fn sample_is_capped() {
        let rows = many(6000);
        let refs: Vec<&Transaction> = rows.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = map_sample(&refs, MAP_SAMPLE_CAP, &mut rng);
        assert_eq!(sample.len(), MAP_SAMPLE_CAP);

        // No duplicates: values are unique per row.
        let mut values: Vec<f64> = sample.iter().map(|t| t.value).collect();
        values.dedup();
        assert_eq!(values.len(), MAP_SAMPLE_CAP);
    }

    #[test]
    fn small_sets_are_sampled_whole() {
        let rows = many(120);
        let refs: Vec<&Transaction> = rows.iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(map_sample(&refs, MAP_SAMPLE_CAP, &mut rng), refs);
    }

    #[test]
    fn rows_without_coordinates_are_still_sampled() {
        let mut rows = many(10);
        for t in rows.iter_mut().step_by(3) {
            t.latitude = None;
        }
        let ds = TransactionDataset::from_transactions(rows);
        let sel = FilterSelection::defaults(&ds);
        let view = FilteredView::compute(&ds, &sel, &mut StdRng::seed_from_u64(3));
        assert_eq!(view.records.len(), 10);
        assert_eq!(view.map_sample, view.records);
    }

    #[test]
    fn capped_sample_keeps_input_order() {
        let rows = many(6000);
        let refs: Vec<&Transaction> = rows.iter().collect();
        let sample = map_sample(&refs, 10, &mut StdRng::seed_from_u64(11));
        assert_eq!(sample.len(), 10);
        assert!(sample.windows(2).all(|w| w[0].value < w[1].value));
    }

    #[test]
    fn recent_rows_are_newest_first_and_stable() {
        let rows = vec![
            tx(5, 1.0, 1.0, PropertyType::House),
            tx(9, 2.0, 1.0, PropertyType::House),
            tx(5, 3.0, 1.0, PropertyType::House),
            tx(1, 4.0, 1.0, PropertyType::House),
        ];
        let refs: Vec<&Transaction> = rows.iter().collect();
        let recent = most_recent(&refs, RECENT_ROWS);
        let values: Vec<f64> = recent.iter().map(|t| t.value).collect();
        assert_eq!(values, vec![2.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn recent_table_is_bounded() {
        let rows = many(450);
        let refs: Vec<&Transaction> = rows.iter().collect();
        let recent = most_recent(&refs, RECENT_ROWS);
        assert_eq!(recent.len(), RECENT_ROWS);
        assert!(recent
            .windows(2)
            .all(|w| w[0].mutation_date >= w[1].mutation_date));
    }

    #[test]
    fn histogram_counts_every_row() {
        let rows = [
            tx(0, 80_000.0, 40.0, PropertyType::House),
            tx(1, 100_000.0, 50.0, PropertyType::House),
            tx(2, 300_000.0, 100.0, PropertyType::Apartment),
            tx(3, 120_000.0, 30.0, PropertyType::Apartment),
        ];
        let refs: Vec<&Transaction> = rows.iter().collect();
        let h = price_histogram(&refs, 4).unwrap();
        assert_eq!(h.min, 2000.0);
        assert_eq!(h.bin_width, 500.0);
        assert_eq!(h.counts[&PropertyType::House], vec![2, 0, 0, 0]);
        assert_eq!(h.counts[&PropertyType::Apartment], vec![0, 0, 1, 1]);
        assert_eq!(h.bin_center(0), 2250.0);

        let breakdown = type_breakdown(&refs);
        assert_eq!(breakdown[&PropertyType::House], 2);
        assert_eq!(breakdown[&PropertyType::Apartment], 2);
    }

    #[test]
    fn view_over_an_empty_selection_has_no_data() {
        let ds = TransactionDataset::from_transactions(many(10));
        let mut sel = FilterSelection::defaults(&ds);
        sel.postal_codes.clear();
        let view = FilteredView::compute(&ds, &sel, &mut StdRng::seed_from_u64(1));
        assert!(view.records.is_empty());
        assert_eq!(view.stats, None);
        assert!(view.map_sample.is_empty());
        assert!(view.recent.is_empty());
    }

    #[test]
    fn view_sizes_follow_the_filtered_count() {
        let ds = TransactionDataset::from_transactions(many(150));
        let sel = FilterSelection::defaults(&ds);
        let view = FilteredView::compute(&ds, &sel, &mut StdRng::seed_from_u64(1));
        assert_eq!(view.records.len(), 150);
        assert_eq!(view.stats.map(|s| s.count), Some(150));
        assert_eq!(view.map_sample.len(), 150);
        assert_eq!(view.recent.len(), 100);
    }
}
