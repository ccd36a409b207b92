use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Monetary equality tolerance, in currency units.
pub const EPSILON: f64 = 0.01;

/// Amount rounded to whole kuruş.
pub fn kurus(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// `|a - b| < EPSILON`, taken in whole kuruş so that a one-kuruş gap is a
/// mismatch at every magnitude.
pub fn amounts_equal(a: f64, b: f64) -> bool {
    (kurus(a) - kurus(b)).abs() < kurus(EPSILON)
}

/// `|amount| > EPSILON`, in whole kuruş.
pub fn exceeds_epsilon(amount: f64) -> bool {
    kurus(amount).abs() > kurus(EPSILON)
}

/// Date used for tie-breaking when a record's date could not be parsed.
pub fn epoch() -> NaiveDate {
    NaiveDate::default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Wholesaler account statement.
    Depo,
    /// The pharmacy's own ledger export.
    Eczane,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Depo, Side::Eczane];

    /// Stable key used in the filter file.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Depo => "depo",
            Self::Eczane => "eczane",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depo => write!(f, "Depo"),
            Self::Eczane => write!(f, "Eczane"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw tabular data
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as read from the input file.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed string form. Used for invoice ids and filter comparison, so
    /// both sides of a filter rule see the same text for the same cell.
    pub fn as_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => number_text(*n),
            Self::Date(d) => d.format("%d.%m.%Y").to_string(),
        }
    }
}

/// Integral floats print without a fractional part (`1234.0` -> `1234`).
pub fn number_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

static MISSING: Cell = Cell::Missing;

/// One data row, keyed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    cells: HashMap<String, Cell>,
}

impl Row {
    pub fn new(line: usize) -> Self {
        Self {
            line,
            cells: HashMap::new(),
        }
    }

    pub fn with_cells<I, K>(line: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        Self {
            line,
            cells: cells.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    /// Cell under `column`; absent columns read as missing.
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(Cell::is_missing)
    }
}

/// A loaded sheet: header names in source order plus rows in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Distinct non-blank values of `column` in order of first appearance.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut values = Vec::new();
        for row in &self.rows {
            let cell = row.get(column);
            if cell.is_missing() {
                continue;
            }
            let text = cell.as_text();
            if seen.insert(text.clone()) {
                values.push(text);
            }
        }
        values
    }
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub debit: f64,
    pub credit: f64,
    /// `None` when the source date could not be parsed.
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub kind: String,
    pub side: Side,
    pub line: usize,
}

impl Record {
    /// Debit when it is non-zero, otherwise the credit magnitude.
    pub fn net_amount(&self) -> f64 {
        if exceeds_epsilon(self.debit) {
            self.debit
        } else {
            self.credit.abs()
        }
    }

    pub fn date_or_epoch(&self) -> NaiveDate {
        self.date.unwrap_or_else(epoch)
    }
}

/// Records keyed by invoice id, iterated in insertion order.
///
/// Replacing an existing id keeps its original position, so iteration order
/// is always the order in which ids first appeared in the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMap {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record`, returning the record it replaced.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        match self.index.get(&record.id) {
            Some(&pos) => Some(std::mem::replace(&mut self.records[pos], record)),
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl FromIterator<Record> for RecordMap {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut map = RecordMap::new();
        for record in iter {
            map.insert(record);
        }
        map
    }
}

impl<'a> IntoIterator for &'a RecordMap {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, debit: f64, credit: f64) -> Record {
        Record {
            id: id.to_string(),
            debit,
            credit,
            date: None,
            kind: String::new(),
            side: Side::Depo,
            line: 2,
        }
    }

    #[test]
    fn test_amounts_equal_in_whole_kurus() {
        assert!(amounts_equal(10.0, 10.0));
        assert!(amounts_equal(1234.56, 1234.5600000001));
        assert!(amounts_equal(0.1 + 0.2, 0.3));
        assert!(!amounts_equal(10.0, 10.01));
        assert!(!amounts_equal(1234.56, 1234.57));
        assert!(!amounts_equal(100.0, 100.01));
        assert!(!amounts_equal(-5.0, 5.0));
    }

    #[test]
    fn test_exceeds_epsilon_is_strict() {
        assert!(!exceeds_epsilon(0.0));
        assert!(!exceeds_epsilon(0.01));
        assert!(!exceeds_epsilon(-0.01));
        assert!(exceeds_epsilon(0.02));
        assert!(exceeds_epsilon(-0.02));
    }

    #[test]
    fn test_net_amount_prefers_debit() {
        assert_eq!(rec("A", 100.0, 0.0).net_amount(), 100.0);
        assert_eq!(rec("B", 0.0, 50.0).net_amount(), 50.0);
        assert_eq!(rec("C", 0.0, -50.0).net_amount(), 50.0);
        assert_eq!(rec("D", 30.0, 20.0).net_amount(), 30.0);
        assert_eq!(rec("E", 0.005, 7.0).net_amount(), 7.0);
        assert_eq!(rec("F", 0.01, 7.0).net_amount(), 7.0);
    }

    #[test]
    fn test_record_map_replace_keeps_position() {
        let mut map = RecordMap::new();
        assert!(map.insert(rec("A", 1.0, 0.0)).is_none());
        assert!(map.insert(rec("B", 2.0, 0.0)).is_none());
        let old = map.insert(rec("A", 3.0, 0.0)).unwrap();
        assert_eq!(old.debit, 1.0);
        let ids: Vec<&str> = map.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(map.get("A").unwrap().debit, 3.0);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_cell_text_forms() {
        assert_eq!(Cell::Number(12345.0).as_text(), "12345");
        assert_eq!(Cell::Number(12.5).as_text(), "12.5");
        assert_eq!(Cell::Text("  FTR-1 ".into()).as_text(), "FTR-1");
        assert_eq!(Cell::Missing.as_text(), "");
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(Cell::Date(d).as_text(), "10.01.2024");
        assert!(Cell::Text("   ".into()).is_missing());
    }

    #[test]
    fn test_distinct_values_in_first_seen_order() {
        let mut table = Table::new(vec!["Tip".into()]);
        for (i, v) in ["Fatura", "İade", "Fatura", ""].iter().enumerate() {
            table
                .rows
                .push(Row::with_cells(i + 2, [("Tip", Cell::Text(v.to_string()))]));
        }
        assert_eq!(table.distinct_values("Tip"), vec!["Fatura", "İade"]);
    }
}
