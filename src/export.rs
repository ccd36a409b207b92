use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::Result;
use crate::matcher::{AmountPair, ExactPair, Unmatched};
use crate::models::Side;
use crate::report::ReconReport;

pub const SUMMARY_SHEET: &str = "summary";
pub const EXCLUDED_SHEET: &str = "excluded";

const EXACT_HEADER: &[&str] = &["invoice_id", "wholesaler_debit", "pharmacy_debit"];
const ORANGE_HEADER: &[&str] = &["invoice_id", "wholesaler_debit", "pharmacy_debit", "signed_difference"];
const YELLOW_HEADER: &[&str] = &["wholesaler_invoice", "pharmacy_invoice", "matched_amount"];
const RED_HEADER: &[&str] = &["invoice_id", "debit", "credit"];
const EXCLUDED_HEADER: &[&str] = &["side", "line", "invoice_id", "column", "value"];

/// Write the report as a workbook: a summary sheet first, then one sheet
/// per non-empty bucket, then the filtered rows when there are any.
///
/// Amount columns labelled `debit` carry each record's net amount; the red
/// sheets keep the raw debit and credit.
pub fn write_report(report: &ReconReport, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let money = Format::new().set_num_format("#,##0.00");
    let bold = Format::new().set_bold();

    write_summary(workbook.add_worksheet().set_name(SUMMARY_SHEET)?, report, &bold, &money)?;

    let b = &report.buckets;
    if !b.green.is_empty() {
        let ws = workbook.add_worksheet().set_name("green")?;
        write_exact(ws, &b.green, false, &bold, &money)?;
    }
    if !b.yellow.is_empty() {
        let ws = workbook.add_worksheet().set_name("yellow")?;
        write_yellow(ws, &b.yellow, &bold, &money)?;
    }
    if !b.orange.is_empty() {
        let ws = workbook.add_worksheet().set_name("orange")?;
        write_exact(ws, &b.orange, true, &bold, &money)?;
    }
    if !b.red_eczane.is_empty() {
        let ws = workbook.add_worksheet().set_name("red-pharmacy-only")?;
        write_red(ws, &b.red_eczane, &bold, &money)?;
    }
    if !b.red_depo.is_empty() {
        let ws = workbook.add_worksheet().set_name("red-wholesaler-only")?;
        write_red(ws, &b.red_depo, &bold, &money)?;
    }
    if !report.depo.excluded.is_empty() || !report.eczane.excluded.is_empty() {
        let ws = workbook.add_worksheet().set_name(EXCLUDED_SHEET)?;
        write_excluded(ws, report, &bold)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_header(ws: &mut Worksheet, header: &[&str], bold: &Format) -> Result<()> {
    for (col, name) in header.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *name, bold)?;
    }
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_summary(ws: &mut Worksheet, report: &ReconReport, bold: &Format, money: &Format) -> Result<()> {
    write_header(ws, &["bucket", "count", "total"], bold)?;
    let t = &report.totals;
    let rows: [(&str, usize, f64); 7] = [
        ("green", t.green_count, t.green_total),
        ("yellow", t.yellow_count, t.yellow_total),
        ("orange (wholesaler)", t.orange_count, t.orange_depo_total),
        ("orange (pharmacy)", t.orange_count, t.orange_eczane_total),
        ("orange (difference)", t.orange_count, t.orange_difference),
        ("red-pharmacy-only", t.red_eczane_count, t.red_eczane_total),
        ("red-wholesaler-only", t.red_depo_count, t.red_depo_total),
    ];
    let mut row = 1u32;
    for (label, count, total) in rows {
        ws.write_string(row, 0, label)?;
        ws.write_number(row, 1, count as f64)?;
        ws.write_number_with_format(row, 2, total, money)?;
        row += 1;
    }

    row += 1;
    ws.write_string_with_format(row, 0, "balance", bold)?;
    row += 1;
    for (label, value) in [
        ("net_wholesaler", report.net_depo()),
        ("net_pharmacy", report.net_eczane()),
        ("net_difference", report.net_difference),
    ] {
        ws.write_string(row, 0, label)?;
        ws.write_number_with_format(row, 2, value, money)?;
        row += 1;
    }

    row += 1;
    ws.write_string_with_format(row, 0, "excluded_rows", bold)?;
    row += 1;
    for side in Side::ALL {
        ws.write_string(row, 0, side.key())?;
        ws.write_number(row, 1, report.side(side).stats.filtered as f64)?;
        row += 1;
    }

    if !report.warnings.is_empty() {
        row += 1;
        ws.write_string_with_format(row, 0, "warnings", bold)?;
        for warning in &report.warnings {
            row += 1;
            ws.write_string(row, 0, warning.to_string())?;
        }
    }

    ws.set_column_width(0, 24)?;
    ws.set_column_width(2, 16)?;
    Ok(())
}

fn write_exact(
    ws: &mut Worksheet,
    pairs: &[ExactPair],
    with_difference: bool,
    bold: &Format,
    money: &Format,
) -> Result<()> {
    write_header(ws, if with_difference { ORANGE_HEADER } else { EXACT_HEADER }, bold)?;
    for (i, pair) in pairs.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &pair.id)?;
        ws.write_number_with_format(row, 1, pair.depo.net_amount(), money)?;
        ws.write_number_with_format(row, 2, pair.eczane.net_amount(), money)?;
        if with_difference {
            ws.write_number_with_format(row, 3, pair.difference(), money)?;
        }
    }
    ws.set_column_width(0, 20)?;
    Ok(())
}

fn write_yellow(ws: &mut Worksheet, pairs: &[AmountPair], bold: &Format, money: &Format) -> Result<()> {
    write_header(ws, YELLOW_HEADER, bold)?;
    for (i, pair) in pairs.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &pair.depo_id)?;
        ws.write_string(row, 1, &pair.eczane_id)?;
        ws.write_number_with_format(row, 2, pair.amount(), money)?;
    }
    ws.set_column_width(0, 20)?;
    ws.set_column_width(1, 20)?;
    Ok(())
}

fn write_red(ws: &mut Worksheet, records: &[Unmatched], bold: &Format, money: &Format) -> Result<()> {
    write_header(ws, RED_HEADER, bold)?;
    for (i, u) in records.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, &u.id)?;
        ws.write_number_with_format(row, 1, u.record.debit, money)?;
        ws.write_number_with_format(row, 2, u.record.credit, money)?;
    }
    ws.set_column_width(0, 20)?;
    Ok(())
}

fn write_excluded(ws: &mut Worksheet, report: &ReconReport, bold: &Format) -> Result<()> {
    write_header(ws, EXCLUDED_HEADER, bold)?;
    let mut row = 1u32;
    for side in Side::ALL {
        for ex in &report.side(side).excluded {
            ws.write_string(row, 0, side.key())?;
            ws.write_number(row, 1, ex.line as f64)?;
            ws.write_string(row, 2, &ex.id)?;
            ws.write_string(row, 3, &ex.column)?;
            ws.write_string(row, 4, &ex.value)?;
            row += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterSet;
    use crate::models::{Cell, Row, Table};
    use crate::report::{reconcile, ReconcileOptions};
    use calamine::{open_workbook_auto, Data, Reader};

    fn sheet(rows: &[(&str, f64, &str)]) -> Table {
        let mut t = Table::new(vec!["Evrak No".into(), "Borç".into(), "Tip".into()]);
        for (i, (id, debit, kind)) in rows.iter().enumerate() {
            t.rows.push(Row::with_cells(
                i + 2,
                [
                    ("Evrak No", Cell::Text(id.to_string())),
                    ("Borç", Cell::Number(*debit)),
                    ("Tip", Cell::Text(kind.to_string())),
                ],
            ));
        }
        t
    }

    fn sample_report() -> ReconReport {
        let w = sheet(&[("A", 100.0, ""), ("C", 120.0, ""), ("X", 10.0, ""), ("D", 5.0, "İade")]);
        let p = sheet(&[("A", 100.0, ""), ("C", 100.0, ""), ("Y", 20.0, "")]);
        let mut filters = FilterSet::default();
        filters.add(Side::Depo, "Tip", "İade");
        reconcile(&w, &p, &filters, &ReconcileOptions::default()).unwrap()
    }

    #[test]
    fn test_only_non_empty_buckets_get_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mutabakat.xlsx");
        write_report(&sample_report(), &path).unwrap();

        let workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec![
                "summary",
                "green",
                "orange",
                "red-pharmacy-only",
                "red-wholesaler-only",
                "excluded"
            ]
        );
    }

    #[test]
    fn test_unwritable_target_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yok").join("mutabakat.xlsx");
        let err = write_report(&sample_report(), &path).unwrap_err();
        assert!(matches!(err, crate::error::MutabakatError::Export(_)));
        assert!(err.to_string().starts_with("Excel çıktısı yazılamadı"));
    }

    #[test]
    fn test_orange_sheet_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mutabakat.xlsx");
        write_report(&sample_report(), &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("orange").unwrap();
        let rows: Vec<&[Data]> = range.rows().collect();
        assert_eq!(rows[0][0], Data::String("invoice_id".into()));
        assert_eq!(rows[0][3], Data::String("signed_difference".into()));
        assert_eq!(rows[1][0], Data::String("C".into()));
        assert_eq!(rows[1][1], Data::Float(120.0));
        assert_eq!(rows[1][2], Data::Float(100.0));
        assert_eq!(rows[1][3], Data::Float(20.0));
    }

    #[test]
    fn test_excluded_sheet_lists_filtered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mutabakat.xlsx");
        write_report(&sample_report(), &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range(EXCLUDED_SHEET).unwrap();
        let rows: Vec<&[Data]> = range.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Data::String("depo".into()));
        assert_eq!(rows[1][2], Data::String("D".into()));
        assert_eq!(rows[1][4], Data::String("İade".into()));
    }

    #[test]
    fn test_empty_report_has_only_summary() {
        let empty = Table::new(vec!["Evrak No".into(), "Borç".into()]);
        let report = reconcile(&empty, &empty, &FilterSet::default(), &ReconcileOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bos.xlsx");
        write_report(&report, &path).unwrap();
        let workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![SUMMARY_SHEET]);
    }
}
