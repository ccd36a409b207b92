use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MutabakatError, Result};
use crate::filters::FilterSet;
use crate::loader::excel_serial_to_date;
use crate::models::{amounts_equal, Cell, Record, RecordMap, Side, Table};
use crate::schema::SchemaMapping;

/// What to do when one side lists the same invoice id more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later rows replace earlier ones; the id keeps its first position.
    #[default]
    LastWins,
    FirstWins,
    /// Fail the reconciliation with `DuplicateInvoice`.
    Reject,
}

/// A row dropped by a filter rule, kept for the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedRow {
    pub line: usize,
    pub id: String,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeStats {
    pub raw_rows: usize,
    pub filtered: usize,
    pub empty_id: usize,
    pub zero_amount: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSide {
    pub side: Side,
    pub records: RecordMap,
    pub excluded: Vec<ExcludedRow>,
    /// Ids seen more than once, in order of their first repeat.
    pub duplicate_ids: Vec<String>,
    pub stats: NormalizeStats,
}

/// Turn the raw rows of one side into canonical records keyed by id.
///
/// Rows are dropped when a filter rule matches, when the id is blank or
/// `nan`, or when both amounts are zero. Missing debit or credit columns
/// read as zero.
pub fn normalize(
    table: &Table,
    schema: &SchemaMapping,
    side: Side,
    filters: &FilterSet,
    policy: DuplicatePolicy,
) -> Result<NormalizedSide> {
    let invoice_col = schema.require_invoice(side, &table.columns)?;

    let mut out = NormalizedSide {
        side,
        records: RecordMap::new(),
        excluded: Vec::new(),
        duplicate_ids: Vec::new(),
        stats: NormalizeStats {
            raw_rows: table.rows.len(),
            ..Default::default()
        },
    };

    for row in &table.rows {
        let id = row.get(invoice_col).as_text();

        if let Some(hit) = filters.matching_rule(side, row) {
            out.stats.filtered += 1;
            out.excluded.push(ExcludedRow {
                line: row.line,
                id,
                column: hit.column,
                value: hit.value,
            });
            continue;
        }

        if id.is_empty() || id.eq_ignore_ascii_case("nan") {
            out.stats.empty_id += 1;
            continue;
        }

        let debit = schema.debit_col.as_deref().map_or(0.0, |c| parse_amount(row.get(c)));
        let credit = schema.credit_col.as_deref().map_or(0.0, |c| parse_amount(row.get(c)));
        if amounts_equal(debit, 0.0) && amounts_equal(credit, 0.0) {
            out.stats.zero_amount += 1;
            continue;
        }

        let record = Record {
            id,
            debit,
            credit,
            date: schema.date_col.as_deref().and_then(|c| parse_date(row.get(c))),
            kind: schema
                .type_col
                .as_deref()
                .map(|c| row.get(c).as_text())
                .unwrap_or_default(),
            side,
            line: row.line,
        };

        if out.records.contains(&record.id) {
            out.stats.duplicates += 1;
            if !out.duplicate_ids.contains(&record.id) {
                out.duplicate_ids.push(record.id.clone());
            }
            match policy {
                DuplicatePolicy::LastWins => {
                    out.records.insert(record);
                }
                DuplicatePolicy::FirstWins => {}
                DuplicatePolicy::Reject => {
                    return Err(MutabakatError::DuplicateInvoice { side, id: record.id });
                }
            }
        } else {
            out.records.insert(record);
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Magnitude of an amount cell; blanks and unparsable text read as zero.
pub fn parse_amount(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => parse_amount_text(s),
        Cell::Missing | Cell::Date(_) => 0.0,
    };
    if value.is_finite() {
        value.abs()
    } else {
        0.0
    }
}

/// Parse `1.234,56`, `1,234.56`, `1234,56`, `₺1.234`, `(500,00)` and the like.
pub fn parse_amount_text(raw: &str) -> f64 {
    let s: String = raw
        .replace("TL", "")
        .replace("TRY", "")
        .chars()
        .filter(|c| !matches!(c, '₺' | '$' | '"' | ' ' | '\u{a0}'))
        .collect();
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -parse_amount_text(inner);
    }
    let canonical = match (s.rfind(','), s.rfind('.')) {
        // both present: whichever comes last is the decimal separator
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if s.matches(',').count() == 1 && is_thousands_group(s, ',') => {
            s.replace(',', "")
        }
        // Turkish decimal comma
        (Some(_), None) if s.matches(',').count() == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        // several dots can only be thousands grouping
        (None, Some(_)) if s.matches('.').count() > 1 => s.replace('.', ""),
        (None, Some(_)) if is_thousands_group(s, '.') => s.replace('.', ""),
        _ => s.to_string(),
    };
    canonical.parse().unwrap_or(0.0)
}

/// A lone separator between 1-3 leading digits and exactly three trailing
/// digits groups thousands: `1.250`, `12.500`, `1,250`. A leading zero
/// keeps it decimal (`0,125`).
fn is_thousands_group(s: &str, sep: char) -> bool {
    let Some((int, frac)) = s.split_once(sep) else {
        return false;
    };
    let int = int.trim_start_matches(['-', '+']);
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    frac.len() == 3
        && digits(frac)
        && (1..=3).contains(&int.len())
        && digits(int)
        && !int.starts_with('0')
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

/// Liberal date parse. `None` stands for the epoch sentinel.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date_text(s),
        Cell::Missing => None,
    }
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // drop a trailing time part: "10.01.2024 14:30:00", "2024-01-10T14:30:00"
    let date_part = raw
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}
