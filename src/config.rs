use std::path::Path;

use serde::Deserialize;

use crate::error::{DatasetError, Result};

/// What the cleaner does with a row that holds a sentinel or empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Drop the whole row.
    #[default]
    DropRow,
    /// Replace the missing cell with the column type's default.
    ImputeDefault,
    /// Keep the row with a `Null` cell and report its index.
    FlagAndKeep,
}

/// How repeated food names are handled at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamePolicy {
    /// Keep every row. Name-keyed lookups resolve to the last row.
    #[default]
    KeepAll,
    /// Fail the load.
    Reject,
    KeepFirst,
    KeepLast,
}

/// Options controlling how a food table is read and cleaned.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "missing_policy": "flag_and_keep", "duplicate_names": "reject" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Field delimiter for delimited text input.
    pub delimiter: char,
    pub missing_policy: MissingPolicy,
    pub duplicate_names: DuplicateNamePolicy,
    /// When false, a table that is empty after cleaning fails the load.
    pub allow_empty: bool,
    /// Text values treated as unknown in addition to `-1`.
    pub extra_sentinels: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            missing_policy: MissingPolicy::default(),
            duplicate_names: DuplicateNamePolicy::default(),
            allow_empty: true,
            extra_sentinels: Vec::new(),
        }
    }
}

impl LoadOptions {
    /// Read options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let options: LoadOptions =
            serde_json::from_str(text).map_err(|e| DatasetError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub(crate) fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                DatasetError::Config(format!(
                    "delimiter must be a single ASCII character, got {:?}",
                    self.delimiter
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        Ok(())
    }
}
