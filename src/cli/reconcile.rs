use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::read_filters;
use crate::error::Result;
use crate::export;
use crate::fmt::{date, money};
use crate::matcher::Buckets;
use crate::models::{amounts_equal, Side};
use crate::normalizer::DuplicatePolicy;
use crate::report::{reconcile_files, ReconReport, ReconcileOptions};
use crate::settings::load_settings;

pub fn run(
    depo: &Path,
    eczane: &Path,
    filters_override: Option<&Path>,
    json: bool,
    export_to: Option<&Path>,
    duplicates: Option<DuplicatePolicy>,
) -> Result<()> {
    let settings = load_settings();
    let (_, filters) = read_filters(filters_override)?;
    let options = ReconcileOptions {
        duplicate_policy: duplicates.unwrap_or(settings.duplicate_policy),
        ..Default::default()
    };

    tracing::info!(depo = %depo.display(), eczane = %eczane.display(), "reconciling");
    let report = reconcile_files(depo, eczane, &filters, &options)?;
    for side in Side::ALL {
        tracing::debug!(?side, schema = ?report.side(side).schema, "resolved schema");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_report(&report));
    }

    if let Some(target) = export_to {
        let path = settings.export_path(target);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        export::write_report(&report, &path)?;
        tracing::info!(path = %path.display(), "exported workbook");
        eprintln!("Excel raporu yazıldı: {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report → String)
// ---------------------------------------------------------------------------

pub fn format_report(report: &ReconReport) -> String {
    let mut out = format_summary(report);
    let buckets = format_buckets(&report.buckets);
    if !buckets.is_empty() {
        out.push_str("\n\n");
        out.push_str(&buckets);
    }
    if !report.warnings.is_empty() {
        out.push_str("\n\n");
        out.push_str(&"Uyarılar".yellow().bold().to_string());
        for w in &report.warnings {
            out.push_str(&format!("\n  ! {w}"));
        }
    }
    out
}

pub fn format_summary(report: &ReconReport) -> String {
    let t = &report.totals;
    let mut table = Table::new();
    table.set_header(vec!["Durum", "Adet", "Tutar"]);
    table.add_row(vec![
        Cell::new("Tam eşleşme".green().bold()),
        Cell::new(t.green_count),
        Cell::new(money(t.green_total)),
    ]);
    table.add_row(vec![
        Cell::new("Tutar eşleşmesi (farklı no)".yellow().bold()),
        Cell::new(t.yellow_count),
        Cell::new(money(t.yellow_total)),
    ]);
    table.add_row(vec![
        Cell::new("Tutar farkı (aynı no)".truecolor(255, 165, 0).bold()),
        Cell::new(t.orange_count),
        Cell::new(format!(
            "{} / {} (fark {})",
            money(t.orange_depo_total),
            money(t.orange_eczane_total),
            money(t.orange_difference)
        )),
    ]);
    table.add_row(vec![
        Cell::new("Sadece depoda".red().bold()),
        Cell::new(t.red_depo_count),
        Cell::new(money(t.red_depo_total)),
    ]);
    table.add_row(vec![
        Cell::new("Sadece eczanede".red().bold()),
        Cell::new(t.red_eczane_count),
        Cell::new(money(t.red_eczane_total)),
    ]);

    let mut balance = Table::new();
    balance.set_header(vec!["", "Depo", "Eczane"]);
    balance.add_row(vec![
        Cell::new("Kayıt"),
        Cell::new(report.depo.records),
        Cell::new(report.eczane.records),
    ]);
    balance.add_row(vec![
        Cell::new("Filtrelenen"),
        Cell::new(report.depo.stats.filtered),
        Cell::new(report.eczane.stats.filtered),
    ]);
    balance.add_row(vec![
        Cell::new("Borç"),
        Cell::new(money(report.depo.total_debit)),
        Cell::new(money(report.eczane.total_debit)),
    ]);
    balance.add_row(vec![
        Cell::new("Alacak"),
        Cell::new(money(report.depo.total_credit)),
        Cell::new(money(report.eczane.total_credit)),
    ]);
    balance.add_row(vec![
        Cell::new("Bakiye".bold()),
        Cell::new(money(report.net_depo())),
        Cell::new(money(report.net_eczane())),
    ]);

    let diff = money(report.net_difference);
    let diff_line = if amounts_equal(report.net_difference, 0.0) {
        format!("Bakiye farkı: {}", diff.green().bold())
    } else {
        format!("Bakiye farkı: {}", diff.red().bold())
    };
    let status = if report.is_reconciled() {
        "Tüm kayıtlar eşleşti.".green().bold()
    } else {
        "Eşleşmeyen kayıtlar var.".red().bold()
    };
    format!("Mutabakat Özeti\n{table}\n\n{balance}\n{diff_line}\n{status}")
}

pub fn format_buckets(b: &Buckets) -> String {
    let mut sections = Vec::new();

    if !b.orange.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Evrak No", "Depo", "Eczane", "Fark"]);
        for pair in &b.orange {
            table.add_row(vec![
                Cell::new(&pair.id),
                Cell::new(money(pair.depo.net_amount())),
                Cell::new(money(pair.eczane.net_amount())),
                Cell::new(money(pair.difference())),
            ]);
        }
        sections.push(format!("Tutar Farkı Olanlar\n{table}"));
    }

    if !b.yellow.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Depo Evrak", "Eczane Evrak", "Tutar", "Depo Tarih", "Eczane Tarih"]);
        for pair in &b.yellow {
            table.add_row(vec![
                Cell::new(&pair.depo_id),
                Cell::new(&pair.eczane_id),
                Cell::new(money(pair.amount())),
                Cell::new(date(pair.depo.date)),
                Cell::new(date(pair.eczane.date)),
            ]);
        }
        sections.push(format!("Farklı Numarayla Eşleşenler\n{table}"));
    }

    for (title, items) in [("Sadece Depoda", &b.red_depo), ("Sadece Eczanede", &b.red_eczane)] {
        if items.is_empty() {
            continue;
        }
        let mut table = Table::new();
        table.set_header(vec!["Evrak No", "Tarih", "Borç", "Alacak", "Satır"]);
        for u in items {
            table.add_row(vec![
                Cell::new(&u.id),
                Cell::new(date(u.record.date)),
                Cell::new(money(u.record.debit)),
                Cell::new(money(u.record.credit)),
                Cell::new(u.record.line),
            ]);
        }
        sections.push(format!("{title}\n{table}"));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterSet;
    use crate::models::{Cell as DataCell, Row, Table as DataTable};
    use crate::report::reconcile;

    fn sheet(rows: &[(&str, f64)]) -> DataTable {
        let mut t = DataTable::new(vec!["Evrak No".into(), "Borç".into(), "Alacak".into()]);
        for (i, (id, debit)) in rows.iter().enumerate() {
            t.rows.push(Row::with_cells(
                i + 2,
                [
                    ("Evrak No", DataCell::Text(id.to_string())),
                    ("Borç", DataCell::Number(*debit)),
                    ("Alacak", DataCell::Missing),
                ],
            ));
        }
        t
    }

    #[test]
    fn test_format_report_sections() {
        let report = reconcile(
            &sheet(&[("A", 100.0), ("C", 120.0), ("X", 10.0)]),
            &sheet(&[("A", 100.0), ("C", 100.0)]),
            &FilterSet::default(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        let out = format_report(&report);
        assert!(out.contains("Mutabakat Özeti"));
        assert!(out.contains("Tutar Farkı Olanlar"));
        assert!(out.contains("Sadece Depoda"));
        assert!(!out.contains("Sadece Eczanede"));
        assert!(out.contains("20,00 TL"));
        assert!(out.contains("Eşleşmeyen kayıtlar var."));
        // no duplicate or missing-column cautions in this run
        assert!(!out.contains("Uyarılar"));
    }

    #[test]
    fn test_format_summary_all_green() {
        let report = reconcile(
            &sheet(&[("A", 100.0), ("B", 1234.56)]),
            &sheet(&[("A", 100.0), ("B", 1234.56)]),
            &FilterSet::default(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        let out = format_summary(&report);
        assert!(out.contains("Tüm kayıtlar eşleşti."));
        assert!(out.contains("Bakiye farkı"));
    }

    #[test]
    fn test_format_report_lists_warnings() {
        let report = reconcile(
            &sheet(&[("A", 1.0), ("A", 2.0)]),
            &sheet(&[]),
            &FilterSet::default(),
            &ReconcileOptions::default(),
        )
        .unwrap();
        let out = format_report(&report);
        assert!(out.contains("Uyarılar"));
        assert!(out.contains("tekrarlanan evrak numarası"));
    }
}
