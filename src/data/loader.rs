use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use once_cell::unsync::OnceCell;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::catalog::CATALOG;
use super::model::{RawDataset, RawRecord, RawValue, COL_MUNICIPALITY_CODE};
use crate::error::SourceError;

// ---------------------------------------------------------------------------
// Source keys and the source seam
// ---------------------------------------------------------------------------

/// What a load is keyed on: one municipality, or the whole department.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKey {
    All,
    Municipality(String),
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::All => write!(f, "all"),
            SourceKey::Municipality(code) => write!(f, "{code}"),
        }
    }
}

/// Supplies raw rows for a key. Implementations may fail; callers degrade a
/// failure to "no data for this key".
pub trait RecordSource {
    fn fetch(&self, key: &SourceKey) -> Result<RawDataset, SourceError>;

    /// Human readable origin, shown in the status bar.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// Local file source
// ---------------------------------------------------------------------------

/// A single file holding every municipality; per-code keys filter it.
///
/// The file is parsed on the first successful fetch and the raw rows are
/// reused for every later key. Open a new source to pick up edits on disk.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
    parsed: OnceCell<RawDataset>,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalFileSource {
            path: path.into(),
            parsed: OnceCell::new(),
        }
    }

    fn parsed(&self) -> Result<&RawDataset, SourceError> {
        self.parsed.get_or_try_init(|| {
            if !self.path.exists() {
                return Err(SourceError::NotFound(self.path.clone()));
            }
            log::debug!("parsing {}", self.path.display());
            load_file(&self.path)
        })
    }
}

impl RecordSource for LocalFileSource {
    fn fetch(&self, key: &SourceKey) -> Result<RawDataset, SourceError> {
        let parsed = self.parsed()?;
        match key {
            SourceKey::All => Ok(parsed.clone()),
            SourceKey::Municipality(code) => {
                let records = parsed
                    .records
                    .iter()
                    .filter(|r| {
                        r.get(COL_MUNICIPALITY_CODE).as_code().as_deref() == Some(code.as_str())
                    })
                    .cloned()
                    .collect();
                Ok(RawDataset::new(parsed.column_names.clone(), records))
            }
        }
    }

    fn describe(&self) -> String {
        format!("local file {}", self.path.display())
    }
}

/// Load a raw dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma separated, header row (the geo-dvf export layout)
/// * `.json`    – `[{ "date_mutation": "...", "valeur_fonciere": 80000, ... }, ...]`
/// * `.parquet` – one column per field, any of Utf8 / Int / Float / Bool / Date32
pub fn load_file(path: &Path) -> Result<RawDataset, SourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => std::fs::File::open(path)
            .context("opening CSV")
            .and_then(load_csv),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => return Err(SourceError::UnsupportedFormat(other.to_string())),
    };
    Ok(loaded.with_context(|| format!("loading {}", path.display()))?)
}

// ---------------------------------------------------------------------------
// Remote per-municipality source
// ---------------------------------------------------------------------------

/// One CSV per municipality code, laid out as
/// `{base_url}/{year}/communes/{department}/{code}.csv`.
pub struct RemoteSource {
    base_url: String,
    year: u16,
    department: String,
    client: reqwest::blocking::Client,
}

impl RemoteSource {
    pub fn new(
        base_url: &str,
        year: u16,
        department: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable {
                key: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(RemoteSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            year,
            department: department.to_string(),
            client,
        })
    }

    pub fn url_for(&self, code: &str) -> String {
        format!(
            "{}/{}/communes/{}/{}.csv",
            self.base_url, self.year, self.department, code
        )
    }

    fn fetch_code(&self, code: &str) -> Result<RawDataset, SourceError> {
        let url = self.url_for(code);
        let unavailable = |reason: String| SourceError::Unavailable {
            key: code.to_string(),
            reason,
        };
        log::debug!("fetching {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {status} from {url}")));
        }
        let body = response.bytes().map_err(|e| unavailable(e.to_string()))?;
        Ok(load_csv(&body[..]).with_context(|| format!("parsing {url}"))?)
    }
}

impl RecordSource for RemoteSource {
    fn fetch(&self, key: &SourceKey) -> Result<RawDataset, SourceError> {
        match key {
            SourceKey::Municipality(code) => self.fetch_code(code),
            SourceKey::All => {
                fetch_each(key, CATALOG.codes(), |code| self.fetch_code(code))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{}/{} (department {})", self.base_url, self.year, self.department)
    }
}

/// Concatenate the per-code datasets, skipping the codes that fail. Only a
/// run where every code failed is an error.
fn fetch_each<'c>(
    key: &SourceKey,
    codes: impl IntoIterator<Item = &'c str>,
    mut fetch_code: impl FnMut(&str) -> Result<RawDataset, SourceError>,
) -> Result<RawDataset, SourceError> {
    let mut all = RawDataset::default();
    let mut attempted = 0usize;
    let mut failures = 0usize;
    for code in codes {
        attempted += 1;
        match fetch_code(code) {
            Ok(ds) => all.extend(ds),
            Err(e) => {
                log::warn!("skipping {code}: {e}");
                failures += 1;
            }
        }
    }
    if attempted > 0 && failures == attempted {
        return Err(SourceError::Unavailable {
            key: key.to_string(),
            reason: format!("all {failures} municipality files failed"),
        });
    }
    Ok(all)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Every cell is kept as text; empty cells become `Null`.
fn load_csv<R: Read>(input: R) -> Result<RawDataset> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(col, cell)| (col.clone(), text_cell(cell)))
            .collect();
        records.push(row);
    }

    Ok(RawDataset::new(headers, records))
}

fn text_cell(s: &str) -> RawValue {
    if s.is_empty() {
        RawValue::Null
    } else {
        RawValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<RawDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());
    for (i, rec) in rows.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        let mut row = RawRecord::default();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            row.insert(key.clone(), json_to_raw(val));
        }
        records.push(row);
    }

    Ok(RawDataset::new(column_names, records))
}

fn json_to_raw(val: &JsonValue) -> RawValue {
    match val {
        JsonValue::String(s) => text_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                RawValue::Float(f)
            } else {
                RawValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => RawValue::Bool(*b),
        JsonValue::Null => RawValue::Null,
        other => RawValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<RawDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        for row in 0..batch.num_rows() {
            let mut record = RawRecord::default();
            for (idx, field) in schema.fields().iter().enumerate() {
                let value = extract_raw_value(batch.column(idx), row)
                    .with_context(|| format!("Row {row}: column '{}'", field.name()))?;
                record.insert(field.name().clone(), value);
            }
            records.push(record);
        }
    }

    Ok(RawDataset::new(column_names, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_raw_value(col: &Arc<dyn Array>, row: usize) -> Result<RawValue> {
    if col.is_null(row) {
        return Ok(RawValue::Null);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => match any.downcast_ref::<StringArray>() {
            Some(s) => text_cell(s.value(row)),
            None => bail!("expected StringArray"),
        },
        DataType::LargeUtf8 => text_cell(col.as_string::<i64>().value(row)),
        DataType::Int32 => match any.downcast_ref::<Int32Array>() {
            Some(arr) => RawValue::Integer(arr.value(row) as i64),
            None => bail!("expected Int32Array"),
        },
        DataType::Int64 => match any.downcast_ref::<Int64Array>() {
            Some(arr) => RawValue::Integer(arr.value(row)),
            None => bail!("expected Int64Array"),
        },
        DataType::Float32 => match any.downcast_ref::<Float32Array>() {
            Some(arr) => RawValue::Float(arr.value(row) as f64),
            None => bail!("expected Float32Array"),
        },
        DataType::Float64 => match any.downcast_ref::<Float64Array>() {
            Some(arr) => RawValue::Float(arr.value(row)),
            None => bail!("expected Float64Array"),
        },
        DataType::Boolean => match any.downcast_ref::<BooleanArray>() {
            Some(arr) => RawValue::Bool(arr.value(row)),
            None => bail!("expected BooleanArray"),
        },
        DataType::Date32 => match any
            .downcast_ref::<Date32Array>()
            .and_then(|arr| arr.value_as_date(row))
        {
            Some(d) => RawValue::Text(d.format("%Y-%m-%d").to_string()),
            None => RawValue::Null,
        },
        other => RawValue::Text(format!("{other:?}")),
    };
    Ok(value)
}
