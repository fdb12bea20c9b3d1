use std::fmt;

use chrono::NaiveDate;

use super::catalog::{Catalog, CATALOG};
use super::model::{
    PropertyType, RawDataset, RawRecord, RawValue, Transaction, TransactionDataset,
    COL_BUILT_AREA, COL_DATE, COL_LATITUDE, COL_LONGITUDE, COL_MUNICIPALITY_CODE,
    COL_MUNICIPALITY_NAME, COL_POSTAL_CODE, COL_PROPERTY_TYPE, COL_VALUE,
};

/// Exclusive bounds on price per m². Outside them: donations, clerical
/// zero-value transfers, land-heavy or bulk sales.
pub const MIN_PRICE_PER_AREA: f64 = 200.0;
pub const MAX_PRICE_PER_AREA: f64 = 15_000.0;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The pipeline stage after which no row was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningStage {
    /// The source had no rows at all.
    Source,
    /// No House / Apartment row.
    PropertyType,
    /// Every residential row lacked a value, surface, postal code or date.
    RequiredFields,
    /// No row had a usable built surface.
    BuiltArea,
    /// Every price per m² fell outside the plausible range.
    PriceOutliers,
}

impl fmt::Display for CleaningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CleaningStage::Source => "the source contains no rows",
            CleaningStage::PropertyType => "no house or apartment transaction",
            CleaningStage::RequiredFields => "no row with value, surface, postal code and date",
            CleaningStage::BuiltArea => "no row with a usable built surface",
            CleaningStage::PriceOutliers => "every price per m² is outside the plausible range",
        };
        write!(f, "{msg}")
    }
}

/// Result of cleaning one raw dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaned {
    Records(TransactionDataset),
    Empty(CleaningStage),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A row after the first coercions, still carrying its raw built surface.
struct Candidate<'a> {
    row: &'a RawRecord,
    mutation_date: Option<NaiveDate>,
    value: Option<f64>,
    property_type: PropertyType,
}

/// Clean a raw dataset against the process-wide catalog.
pub fn clean(raw: &RawDataset) -> Cleaned {
    clean_with_catalog(raw, &CATALOG)
}

/// Turn raw rows into validated transactions.
///
/// Order: coerce date and value, keep residential types, drop rows missing a
/// required field, coerce the built surface, derive the price per m², reject
/// outliers. Whenever a step leaves nothing, the stage is returned instead.
pub fn clean_with_catalog(raw: &RawDataset, catalog: &Catalog) -> Cleaned {
    if raw.is_empty() {
        return Cleaned::Empty(CleaningStage::Source);
    }

    // Date / value coercion and property type narrowing.
    let residential: Vec<Candidate> = raw
        .records
        .iter()
        .filter_map(|row| {
            Some(Candidate {
                row,
                mutation_date: row.get(COL_DATE).as_date(),
                value: row.get(COL_VALUE).as_f64(),
                property_type: PropertyType::from_source(row.get(COL_PROPERTY_TYPE))?,
            })
        })
        .collect();
    log::debug!("cleaning: {} raw rows, {} residential", raw.len(), residential.len());
    if residential.is_empty() {
        return Cleaned::Empty(CleaningStage::PropertyType);
    }

    let complete: Vec<(Candidate, NaiveDate, f64, String)> = residential
        .into_iter()
        .filter_map(|c| {
            if c.row.get(COL_BUILT_AREA).is_missing() {
                return None;
            }
            let date = c.mutation_date?;
            let value = c.value?;
            let postal_code = c.row.get(COL_POSTAL_CODE).as_code()?;
            Some((c, date, value, postal_code))
        })
        .collect();
    log::debug!("cleaning: {} rows with required fields", complete.len());
    if complete.is_empty() {
        return Cleaned::Empty(CleaningStage::RequiredFields);
    }

    let with_area: Vec<(Candidate, NaiveDate, f64, String, f64)> = complete
        .into_iter()
        .filter_map(|(c, date, value, postal_code)| {
            let area = c.row.get(COL_BUILT_AREA).as_f64()?;
            Some((c, date, value, postal_code, area))
        })
        .collect();
    log::debug!("cleaning: {} rows with a numeric built surface", with_area.len());
    if with_area.is_empty() {
        return Cleaned::Empty(CleaningStage::BuiltArea);
    }

    let transactions: Vec<Transaction> = with_area
        .into_iter()
        .filter_map(|(c, date, value, postal_code, area)| {
            // A zero or negative surface leaves the metric undefined.
            if area <= 0.0 {
                return None;
            }
            let price_per_area = value / area;
            if !(price_per_area > MIN_PRICE_PER_AREA && price_per_area < MAX_PRICE_PER_AREA) {
                return None;
            }
            Some(build_transaction(c, date, value, postal_code, area, price_per_area, catalog))
        })
        .collect();
    log::debug!("cleaning: {} rows within the price range", transactions.len());
    if transactions.is_empty() {
        return Cleaned::Empty(CleaningStage::PriceOutliers);
    }

    Cleaned::Records(TransactionDataset::from_transactions(transactions))
}

fn build_transaction(
    c: Candidate,
    mutation_date: NaiveDate,
    value: f64,
    postal_code: String,
    built_area: f64,
    price_per_area: f64,
    catalog: &Catalog,
) -> Transaction {
    let municipality_code = c
        .row
        .get(COL_MUNICIPALITY_CODE)
        .as_code()
        .unwrap_or_default();
    let municipality_name = catalog
        .name_of(&municipality_code)
        .map(str::to_string)
        .or_else(|| c.row.get(COL_MUNICIPALITY_NAME).as_text().map(str::to_string));

    Transaction {
        mutation_date,
        value,
        built_area,
        property_type: c.property_type,
        postal_code,
        municipality_code,
        municipality_name,
        latitude: coordinate(c.row.get(COL_LATITUDE)),
        longitude: coordinate(c.row.get(COL_LONGITUDE)),
        price_per_area,
    }
}

fn coordinate(raw: &RawValue) -> Option<f64> {
    raw.as_f64()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a raw row from (column, text) pairs; empty text becomes Null.
    pub(crate) fn row(cells: &[(&str, &str)]) -> RawRecord {
        cells
            .iter()
            .map(|&(k, v)| {
                let cell = if v.is_empty() {
                    RawValue::Null
                } else {
                    RawValue::Text(v.to_string())
                };
                (k, cell)
            })
            .collect()
    }

    pub(crate) fn sale(date: &str, value: &str, area: &str, kind: &str, postal: &str) -> RawRecord {
        row(&[
            (COL_DATE, date),
            (COL_VALUE, value),
            (COL_BUILT_AREA, area),
            (COL_PROPERTY_TYPE, kind),
            (COL_POSTAL_CODE, postal),
            (COL_MUNICIPALITY_CODE, "23096"),
        ])
    }

    fn raw(records: Vec<RawRecord>) -> RawDataset {
        RawDataset::new(Vec::new(), records)
    }

    fn records(cleaned: Cleaned) -> Vec<Transaction> {
        match cleaned {
            Cleaned::Records(ds) => ds.transactions,
            Cleaned::Empty(stage) => panic!("unexpected empty result at {stage:?}"),
        }
    }

    #[test]
    fn house_at_2000_per_m2_is_kept() {
        let out = records(clean(&raw(vec![sale("2024-05-02", "80000", "40", "Maison", "23000")])));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].price_per_area, 2000.0);
        assert_eq!(out[0].property_type, PropertyType::House);
        assert_eq!(out[0].postal_code, "23000");
        assert_eq!(out[0].mutation_date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
    }

    #[test]
    fn zero_value_is_an_outlier() {
        let cleaned = clean(&raw(vec![sale("2024-05-02", "0", "50", "Maison", "23000")]));
        assert_eq!(cleaned, Cleaned::Empty(CleaningStage::PriceOutliers));
    }

    #[test]
    fn missing_date_drops_the_row() {
        let cleaned = clean(&raw(vec![
            sale("", "80000", "40", "Maison", "23000"),
            sale("not a date", "80000", "40", "Appartement", "23000"),
        ]));
        assert_eq!(cleaned, Cleaned::Empty(CleaningStage::RequiredFields));
    }

    #[test]
    fn outbuildings_are_dropped_before_null_checks() {
        let cleaned = clean(&raw(vec![sale("", "", "", "Dépendance", "")]));
        assert_eq!(cleaned, Cleaned::Empty(CleaningStage::PropertyType));
    }

    #[test]
    fn empty_source_is_reported() {
        assert_eq!(clean(&RawDataset::default()), Cleaned::Empty(CleaningStage::Source));
    }

    #[test]
    fn unparseable_surface_is_dropped_after_presence_check() {
        let cleaned = clean(&raw(vec![sale("2024-05-02", "80000", "forty", "Maison", "23000")]));
        assert_eq!(cleaned, Cleaned::Empty(CleaningStage::BuiltArea));
    }

    #[test]
    fn zero_and_negative_surfaces_are_dropped() {
        let cleaned = clean(&raw(vec![
            sale("2024-05-02", "80000", "0", "Maison", "23000"),
            sale("2024-05-02", "80000", "-40", "Maison", "23000"),
        ]));
        assert_eq!(cleaned, Cleaned::Empty(CleaningStage::PriceOutliers));
    }

    #[test]
    fn bounds_are_exclusive() {
        let out = records(clean(&raw(vec![
            sale("2024-01-01", "20000", "100", "Maison", "23000"),    // 200
            sale("2024-01-01", "1500000", "100", "Maison", "23000"),  // 15000
            sale("2024-01-01", "20100", "100", "Maison", "23000"),    // 201
            sale("2024-01-01", "1499900", "100", "Maison", "23000"),  // 14999
        ])));
        let prices: Vec<f64> = out.iter().map(|t| t.price_per_area).collect();
        assert_eq!(prices, vec![201.0, 14999.0]);
    }

    #[test]
    fn municipality_name_comes_from_catalog_then_source() {
        let mut catalogued = sale("2024-01-01", "80000", "40", "Maison", "23000");
        catalogued.insert(COL_MUNICIPALITY_CODE, RawValue::Text("23001".into()));
        let mut uncatalogued = sale("2024-01-01", "80000", "40", "Maison", "23000");
        uncatalogued.insert(COL_MUNICIPALITY_CODE, RawValue::Text("23096".into()));
        uncatalogued.insert(COL_MUNICIPALITY_NAME, RawValue::Text("Guéret".into()));
        let bare = sale("2024-01-01", "80000", "40", "Maison", "23000");

        let out = records(clean(&raw(vec![catalogued, uncatalogued, bare])));
        assert_eq!(out[0].municipality_name.as_deref(), Some("Ahun"));
        assert_eq!(out[1].municipality_name.as_deref(), Some("Guéret"));
        assert_eq!(out[2].municipality_name, None);
    }

    #[test]
    fn coordinates_are_optional() {
        let mut located = sale("2024-01-01", "80000", "40", "Maison", "23000");
        located.insert(COL_LATITUDE, RawValue::Float(46.17));
        located.insert(COL_LONGITUDE, RawValue::Text("1.87".into()));
        let mut broken = sale("2024-01-01", "80000", "40", "Maison", "23000");
        broken.insert(COL_LATITUDE, RawValue::Text("n/a".into()));

        let out = records(clean(&raw(vec![located, broken])));
        assert_eq!(out[0].coordinates(), Some((46.17, 1.87)));
        assert_eq!(out[1].latitude, None);
        assert_eq!(out[1].coordinates(), None);
    }

    #[test]
    fn clean_records_hold_the_invariants() {
        let rows = vec![
            sale("2024-01-01", "80000", "40", "Maison", "23000"),
            sale("2024-02-01", "95000", "60", "Appartement", "23300"),
            sale("2024-03-01", "", "60", "Appartement", "23300"),
            sale("2024-03-01", "120000", "", "Maison", "23300"),
            sale("2024-03-01", "120000", "80", "Maison", ""),
            sale("2024-03-01", "5000000", "30", "Maison", "23000"),
            sale("2024-03-01", "150000", "90", "Local industriel. commercial ou assimilé", "23000"),
        ];
        let out = records(clean(&raw(rows)));
        assert_eq!(out.len(), 2);
        for t in &out {
            assert!(PropertyType::ALL.contains(&t.property_type));
            assert!(t.price_per_area > MIN_PRICE_PER_AREA && t.price_per_area < MAX_PRICE_PER_AREA);
            assert!(!t.postal_code.is_empty());
            assert!(t.built_area > 0.0);
        }
    }

    #[test]
    fn cleaning_is_idempotent() {
        let data = raw(vec![
            sale("2024-01-01", "80000", "40", "Maison", "23000"),
            sale("2024-02-01", "95000", "60", "Appartement", "23300"),
            sale("2024-03-01", "0", "60", "Appartement", "23300"),
        ]);
        assert_eq!(clean(&data), clean(&data));
    }

    #[test]
    fn dataset_indices_come_from_clean_rows() {
        let ds = match clean(&raw(vec![
            sale("2024-01-01", "80000", "40", "Maison", "23000"),
            sale("2024-02-01", "95000", "60", "Appartement", "23300"),
            sale("2024-02-01", "900000", "1", "Maison", "23400"),
        ])) {
            Cleaned::Records(ds) => ds,
            Cleaned::Empty(stage) => panic!("unexpected empty result at {stage:?}"),
        };
        assert_eq!(ds.max_value, 95000.0);
        assert_eq!(ds.postal_codes.iter().collect::<Vec<_>>(), vec!["23000", "23300"]);
    }
}
