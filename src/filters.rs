use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MutabakatError, Result};
use crate::models::{Row, Side, Table};

pub const FILTER_FILE_NAME: &str = "depo_filtre_ayarlari.json";

/// Columns with more distinct values than this are not offered as filters.
pub const MAX_FILTER_CHOICES: usize = 50;

/// Per-side `column -> excluded values` rules, as stored in the filter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub depo: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub eczane: BTreeMap<String, Vec<String>>,
    /// Whether edits are written back to the filter file.
    #[serde(default = "default_remember")]
    pub hatirla: bool,
    /// Keys this version does not know about, kept so a save does not drop them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_remember() -> bool {
    true
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            depo: BTreeMap::new(),
            eczane: BTreeMap::new(),
            hatirla: default_remember(),
            extra: BTreeMap::new(),
        }
    }
}

/// The rule that excluded a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub column: String,
    pub value: String,
}

impl FilterSet {
    pub fn rules(&self, side: Side) -> &BTreeMap<String, Vec<String>> {
        match side {
            Side::Depo => &self.depo,
            Side::Eczane => &self.eczane,
        }
    }

    fn rules_mut(&mut self, side: Side) -> &mut BTreeMap<String, Vec<String>> {
        match side {
            Side::Depo => &mut self.depo,
            Side::Eczane => &mut self.eczane,
        }
    }

    pub fn is_empty(&self) -> bool {
        Side::ALL
            .iter()
            .all(|side| self.rules(*side).values().all(Vec::is_empty))
    }

    /// Add an excluded value. Returns false if it was already present.
    pub fn add(&mut self, side: Side, column: &str, value: &str) -> bool {
        let value = value.trim().to_string();
        let values = self.rules_mut(side).entry(column.to_string()).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Remove one value, or the whole column when `value` is `None`.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, side: Side, column: &str, value: Option<&str>) -> bool {
        let rules = self.rules_mut(side);
        let removed = match value {
            None => rules.remove(column).is_some(),
            Some(v) => match rules.get_mut(column) {
                Some(values) => {
                    let before = values.len();
                    values.retain(|x| x != v.trim());
                    values.len() != before
                }
                None => false,
            },
        };
        if rules.get(column).is_some_and(Vec::is_empty) {
            rules.remove(column);
        }
        removed
    }

    /// Drop the rules of one side, or of both.
    pub fn clear(&mut self, side: Option<Side>) {
        match side {
            Some(side) => self.rules_mut(side).clear(),
            None => {
                self.depo.clear();
                self.eczane.clear();
            }
        }
    }

    /// First rule that excludes `row`, if any.
    ///
    /// Rules are disjunctive: one hit on any filtered column present in the
    /// row is enough. Columns the row does not carry are ignored.
    pub fn matching_rule(&self, side: Side, row: &Row) -> Option<RuleHit> {
        self.rules(side).iter().find_map(|(column, excluded)| {
            if !row.has_column(column) {
                return None;
            }
            let value = row.get(column).as_text();
            excluded.contains(&value).then(|| RuleHit {
                column: column.clone(),
                value,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// JSON file holding a [`FilterSet`].
///
/// Concurrent writers from several program instances are not coordinated;
/// the last save wins.
#[derive(Debug, Clone)]
pub struct FilterStore {
    path: PathBuf,
}

impl FilterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The filter file next to the running executable.
    pub fn beside_executable() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(dir.join(FILTER_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the rule file. A missing file is an empty rule set; a file that
    /// exists but cannot be read or parsed is `FilterStoreIo`.
    pub fn load(&self) -> Result<FilterSet> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FilterSet::default()),
            Err(e) => return Err(self.store_error(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| self.store_error(e.to_string()))
    }

    /// Like [`load`](Self::load), but an unreadable file yields the empty
    /// rule set together with the error, for the caller to report.
    pub fn load_or_empty(&self) -> (FilterSet, Option<MutabakatError>) {
        match self.load() {
            Ok(filters) => (filters, None),
            Err(e) => (FilterSet::default(), Some(e)),
        }
    }

    /// Write the rule file atomically: a sibling temp file renamed over the target.
    pub fn save(&self, filters: &FilterSet) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(filters)
            .map_err(|e| self.store_error(e.to_string()))?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, format!("{json}\n"))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FILTER_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn store_error(&self, reason: String) -> MutabakatError {
        MutabakatError::FilterStoreIo {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule authoring
// ---------------------------------------------------------------------------

/// A column offered to the operator as an exclusion checklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCandidate {
    pub column: String,
    pub values: Vec<String>,
}

/// Columns whose distinct-value count is between 1 and [`MAX_FILTER_CHOICES`].
pub fn filter_candidates(table: &Table) -> Vec<FilterCandidate> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            let values = table.distinct_values(column);
            (1..=MAX_FILTER_CHOICES)
                .contains(&values.len())
                .then(|| FilterCandidate {
                    column: column.clone(),
                    values,
                })
        })
        .collect()
}
