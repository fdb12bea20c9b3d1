/// Data layer: sources, cleaning, filtering and aggregation.
///
/// Architecture:
/// ```text
///  local .csv / .json / .parquet      remote {code}.csv
///               │                            │
///               ▼                            ▼
///        ┌────────────────────────────────────────┐
///        │  loader    RecordSource → RawDataset   │
///        └────────────────────────────────────────┘
///               │
///               ▼
///        ┌────────────┐
///        │  cleaning  │  coerce, drop, price per m², outliers
///        └────────────┘
///               │           (memoized per SourceKey in `store`)
///               ▼
///        ┌────────────┐
///        │  filter    │  FilterSelection → passing rows
///        └────────────┘
///               │
///               ▼
///        ┌────────────┐
///        │  stats     │  KPIs, map sample, recent rows, histogram
///        └────────────┘
/// ```

pub mod catalog;
pub mod cleaning;
pub mod filter;
pub mod loader;
pub mod model;
pub mod stats;
pub mod store;
