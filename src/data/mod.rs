/// Data layer: core types, loading, cleaning, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → raw Frame (typed schema)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ cleaner   │  normalize name / ingredients, drop incomplete rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply categorical selections → row indices
///   └──────────┘
/// ```

pub mod cleaner;
pub mod filter;
pub mod loader;
pub mod model;
