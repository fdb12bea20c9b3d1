use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Column names of the source files
// ---------------------------------------------------------------------------

pub const COL_DATE: &str = "date_mutation";
pub const COL_VALUE: &str = "valeur_fonciere";
pub const COL_BUILT_AREA: &str = "surface_reelle_bati";
pub const COL_PROPERTY_TYPE: &str = "type_local";
pub const COL_POSTAL_CODE: &str = "code_postal";
pub const COL_MUNICIPALITY_CODE: &str = "code_commune";
pub const COL_MUNICIPALITY_NAME: &str = "nom_commune";
pub const COL_LATITUDE: &str = "latitude";
pub const COL_LONGITUDE: &str = "longitude";

// ---------------------------------------------------------------------------
// RawValue – a single untyped cell
// ---------------------------------------------------------------------------

/// A cell as it came out of the source file, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl RawValue {
    /// Empty or whitespace-only text counts as missing, like an empty CSV cell.
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Float(v) => v.is_nan(),
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion; anything that is not a finite number becomes `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            RawValue::Float(v) => *v,
            RawValue::Integer(i) => *i as f64,
            RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RawValue::Bool(_) | RawValue::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Strict `YYYY-MM-DD` date coercion.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RawValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Render a code-like cell (postal code, INSEE code) as text.
    ///
    /// Integral numbers are zero-padded to five digits so that `1000` and
    /// `"01000"` name the same postal code. Text keeps its value, minus the
    /// `.0` suffix left behind when a code column was stored as floats.
    pub fn as_code(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                Some(s.strip_suffix(".0").unwrap_or(s).to_string())
            }
            RawValue::Integer(i) => Some(format!("{i:05}")),
            RawValue::Float(v) if v.is_finite() && v.fract() == 0.0 => {
                Some(format!("{:05}", *v as i64))
            }
            RawValue::Float(v) if v.is_finite() => Some(v.to_string()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RawRecord / RawDataset – what a record source hands over
// ---------------------------------------------------------------------------

static NULL: RawValue = RawValue::Null;

/// One untyped row: column name → cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    /// Missing columns read as `Null`.
    pub fn get(&self, column: &str) -> &RawValue {
        self.fields.get(column).unwrap_or(&NULL)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        self.fields.insert(column.into(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        RawRecord {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The raw rows of one source key, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub column_names: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawDataset {
    pub fn new(column_names: Vec<String>, records: Vec<RawRecord>) -> Self {
        RawDataset {
            column_names,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append the rows of another dataset, merging the header lists.
    pub fn extend(&mut self, other: RawDataset) {
        for col in other.column_names {
            if !self.column_names.contains(&col) {
                self.column_names.push(col);
            }
        }
        self.records.extend(other.records);
    }
}

// ---------------------------------------------------------------------------
// PropertyType
// ---------------------------------------------------------------------------

/// The residential property types kept by the cleaning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyType {
    House,
    Apartment,
}

impl PropertyType {
    pub const ALL: [PropertyType; 2] = [PropertyType::House, PropertyType::Apartment];

    /// Any other `type_local` (Dépendance, commercial premises, …) is `None`.
    pub fn from_source(raw: &RawValue) -> Option<Self> {
        match raw.as_text()? {
            "Maison" => Some(PropertyType::House),
            "Appartement" => Some(PropertyType::Apartment),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::House => write!(f, "House"),
            PropertyType::Apartment => write!(f, "Apartment"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction – one clean row
// ---------------------------------------------------------------------------

/// A validated transaction with its derived price per m².
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub mutation_date: NaiveDate,
    pub value: f64,
    pub built_area: f64,
    pub property_type: PropertyType,
    pub postal_code: String,
    pub municipality_code: String,
    pub municipality_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price_per_area: f64,
}

impl Transaction {
    /// Both coordinates, when the row can be placed on the map.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ---------------------------------------------------------------------------
// TransactionDataset – the clean dataset with pre-computed indices
// ---------------------------------------------------------------------------

/// Clean records plus the indices the filter defaults are derived from.
///
/// The indices are computed once from the unfiltered records and never
/// change, so the selection bounds stay put while the user narrows them.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDataset {
    pub transactions: Vec<Transaction>,
    /// Sorted unique postal codes.
    pub postal_codes: BTreeSet<String>,
    /// Sorted unique municipality names (rows without a name are not listed).
    pub municipality_names: BTreeSet<String>,
    /// Largest `value` in the dataset, 0 when empty.
    pub max_value: f64,
}

impl TransactionDataset {
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let postal_codes = transactions
            .iter()
            .map(|t| t.postal_code.clone())
            .collect();
        let municipality_names = transactions
            .iter()
            .filter_map(|t| t.municipality_name.clone())
            .collect();
        let max_value = transactions
            .iter()
            .map(|t| t.value)
            .fold(0.0_f64, f64::max);

        TransactionDataset {
            transactions,
            postal_codes,
            municipality_names,
            max_value,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }
}
