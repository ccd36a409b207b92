use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::filters::FilterSet;
use crate::loader;
use crate::matcher::{match_records, Buckets};
use crate::models::{Side, Table};
use crate::normalizer::{normalize, DuplicatePolicy, ExcludedRow, NormalizeStats, NormalizedSide};
use crate::schema::{resolve, Role, RoleCatalog, SchemaMapping};

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub depo_catalog: RoleCatalog,
    pub eczane_catalog: RoleCatalog,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            depo_catalog: RoleCatalog::depo(),
            eczane_catalog: RoleCatalog::eczane(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl ReconcileOptions {
    pub fn catalog(&self, side: Side) -> &RoleCatalog {
        match side {
            Side::Depo => &self.depo_catalog,
            Side::Eczane => &self.eczane_catalog,
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Conditions that do not stop a reconciliation but must reach the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The side's totals are likely understated.
    MissingAmountColumn { side: Side, role: Role },
    AllRowsFiltered { side: Side, raw_rows: usize },
    DuplicateIds { side: Side, count: usize, ids: Vec<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAmountColumn { side, role } => write!(
                f,
                "{side} dosyasında '{role}' sütunu bulunamadı; sıfır kabul edildi, toplamlar eksik olabilir"
            ),
            Self::AllRowsFiltered { side, raw_rows } => write!(
                f,
                "{side} dosyasındaki {raw_rows} satırın tamamı filtrelendi veya geçersiz"
            ),
            Self::DuplicateIds { side, count, ids } => write!(
                f,
                "{side} dosyasında {count} tekrarlanan evrak numarası birleştirildi: {}",
                ids.join(", ")
            ),
        }
    }
}

/// One side's view of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideSummary {
    pub side: Side,
    pub columns: Vec<String>,
    pub schema: SchemaMapping,
    pub stats: NormalizeStats,
    pub records: usize,
    pub total_debit: f64,
    pub total_credit: f64,
    /// Debit minus credit: what the side's books say is owed to the wholesaler.
    pub net: f64,
    pub excluded: Vec<ExcludedRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketTotals {
    pub green_count: usize,
    pub green_total: f64,
    pub yellow_count: usize,
    pub yellow_total: f64,
    pub orange_count: usize,
    pub orange_depo_total: f64,
    pub orange_eczane_total: f64,
    /// Wholesaler minus pharmacy over the orange pairs.
    pub orange_difference: f64,
    pub red_depo_count: usize,
    pub red_depo_total: f64,
    pub red_eczane_count: usize,
    pub red_eczane_total: f64,
}

impl BucketTotals {
    pub fn from_buckets(b: &Buckets) -> Self {
        let orange_depo_total: f64 = b.orange.iter().map(|x| x.depo.net_amount()).sum();
        let orange_eczane_total: f64 = b.orange.iter().map(|x| x.eczane.net_amount()).sum();
        Self {
            green_count: b.green.len(),
            green_total: b.green.iter().map(|x| x.depo.net_amount()).sum(),
            yellow_count: b.yellow.len(),
            yellow_total: b.yellow.iter().map(|x| x.amount()).sum(),
            orange_count: b.orange.len(),
            orange_depo_total,
            orange_eczane_total,
            orange_difference: orange_depo_total - orange_eczane_total,
            red_depo_count: b.red_depo.len(),
            red_depo_total: b.red_depo.iter().map(|x| x.record.net_amount()).sum(),
            red_eczane_count: b.red_eczane.len(),
            red_eczane_total: b.red_eczane.iter().map(|x| x.record.net_amount()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconReport {
    pub depo: SideSummary,
    pub eczane: SideSummary,
    pub buckets: Buckets,
    pub totals: BucketTotals,
    /// `depo.net - eczane.net`.
    pub net_difference: f64,
    pub warnings: Vec<Warning>,
}

impl ReconReport {
    pub fn side(&self, side: Side) -> &SideSummary {
        match side {
            Side::Depo => &self.depo,
            Side::Eczane => &self.eczane,
        }
    }

    pub fn net_depo(&self) -> f64 {
        self.depo.net
    }

    pub fn net_eczane(&self) -> f64 {
        self.eczane.net
    }

    /// True when every record paired off green.
    pub fn is_reconciled(&self) -> bool {
        let b = &self.buckets;
        b.yellow.is_empty()
            && b.orange.is_empty()
            && b.red_depo.is_empty()
            && b.red_eczane.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Load both files and reconcile them.
pub fn reconcile_files(
    depo_path: &Path,
    eczane_path: &Path,
    filters: &FilterSet,
    options: &ReconcileOptions,
) -> Result<ReconReport> {
    let depo = loader::load(depo_path)?;
    let eczane = loader::load(eczane_path)?;
    reconcile(&depo, &eczane, filters, options)
}

/// Reconcile a wholesaler statement against the pharmacy ledger.
///
/// Fails without a partial report when either side has no invoice column.
pub fn reconcile(
    depo: &Table,
    eczane: &Table,
    filters: &FilterSet,
    options: &ReconcileOptions,
) -> Result<ReconReport> {
    let depo_schema = resolve(&depo.columns, options.catalog(Side::Depo));
    let eczane_schema = resolve(&eczane.columns, options.catalog(Side::Eczane));
    depo_schema.require_invoice(Side::Depo, &depo.columns)?;
    eczane_schema.require_invoice(Side::Eczane, &eczane.columns)?;

    let w = normalize(depo, &depo_schema, Side::Depo, filters, options.duplicate_policy)?;
    let p = normalize(eczane, &eczane_schema, Side::Eczane, filters, options.duplicate_policy)?;

    let buckets = match_records(&w.records, &p.records);
    let totals = BucketTotals::from_buckets(&buckets);

    let mut warnings = Vec::new();
    for (norm, schema) in [(&w, &depo_schema), (&p, &eczane_schema)] {
        collect_warnings(norm, schema, &mut warnings);
    }

    let depo = summarize(w, depo_schema, &depo.columns);
    let eczane = summarize(p, eczane_schema, &eczane.columns);
    Ok(ReconReport {
        net_difference: depo.net - eczane.net,
        depo,
        eczane,
        buckets,
        totals,
        warnings,
    })
}

fn collect_warnings(norm: &NormalizedSide, schema: &SchemaMapping, out: &mut Vec<Warning>) {
    let side = norm.side;
    for role in schema.missing_amount_roles() {
        out.push(Warning::MissingAmountColumn { side, role });
    }
    if norm.records.is_empty() && norm.stats.raw_rows > 0 {
        out.push(Warning::AllRowsFiltered {
            side,
            raw_rows: norm.stats.raw_rows,
        });
    }
    if norm.stats.duplicates > 0 {
        out.push(Warning::DuplicateIds {
            side,
            count: norm.stats.duplicates,
            ids: norm.duplicate_ids.clone(),
        });
    }
}

fn summarize(norm: NormalizedSide, schema: SchemaMapping, columns: &[String]) -> SideSummary {
    let total_debit: f64 = norm.records.iter().map(|r| r.debit).sum();
    let total_credit: f64 = norm.records.iter().map(|r| r.credit).sum();
    SideSummary {
        side: norm.side,
        columns: columns.to_vec(),
        schema,
        stats: norm.stats,
        records: norm.records.len(),
        total_debit,
        total_credit,
        net: total_debit - total_credit,
        excluded: norm.excluded,
    }
}
