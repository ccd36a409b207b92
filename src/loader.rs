use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{MutabakatError, Result};
use crate::models::{Cell, Row, Table};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Load the first sheet of a spreadsheet (or a CSV file) into a [`Table`].
///
/// The first row supplies column names. A file with a header but no data
/// rows yields an empty table; that is not an error.
pub fn load(path: &Path) -> Result<Table> {
    ensure_not_locked(path)?;
    match extension(path).as_deref() {
        Some("csv") | Some("txt") => load_csv(path),
        Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => load_workbook(path),
        _ => Err(MutabakatError::UnsupportedFormat(path.display().to_string())),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

// ---------------------------------------------------------------------------
// Lock detection
// ---------------------------------------------------------------------------

/// Fail with `InputLocked` when another process holds the file open.
///
/// Windows reports a sharing violation when Excel has the workbook open;
/// elsewhere the office suites leave an owner file next to the document.
fn ensure_not_locked(path: &Path) -> Result<()> {
    if let Err(e) = File::open(path) {
        return Err(classify_open_error(path, e));
    }
    // A write-share probe catches Excel's deny-write handle. Failures other
    // than a sharing violation (read-only files, for instance) are fine here.
    if let Err(e) = OpenOptions::new().read(true).write(true).open(path) {
        if is_sharing_violation(&e) {
            return Err(locked(path));
        }
    }
    if owner_file(path).is_some() {
        return Err(locked(path));
    }
    Ok(())
}

fn classify_open_error(path: &Path, e: io::Error) -> MutabakatError {
    if is_sharing_violation(&e) {
        locked(path)
    } else {
        MutabakatError::input_io(path, e)
    }
}

fn locked(path: &Path) -> MutabakatError {
    MutabakatError::InputLocked {
        path: path.display().to_string(),
    }
}

fn is_sharing_violation(e: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(e.raw_os_error(), Some(32) | Some(33))
}

/// Office owner file for `path`, if one exists: `~$name.xlsx` (Excel) or
/// `.~lock.name.xlsx#` (LibreOffice).
pub fn owner_file(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    [format!("~${name}"), format!(".~lock.{name}#")]
        .into_iter()
        .map(|candidate| dir.join(candidate))
        .find(|candidate| candidate.exists())
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        MutabakatError::input_io(path, io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    })?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Ok(Table::default());
    };
    let range = workbook.worksheet_range(&first).map_err(|e| {
        MutabakatError::input_io(path, io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    })?;

    let grid = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    Ok(table_from_grid(grid))
}

pub(crate) fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::String(s) if s.trim().is_empty() => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) if f.is_nan() => Cell::Missing,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => Cell::Date(date),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match s.get(..10).and_then(|d| {
            chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()
        }) {
            Some(date) => Cell::Date(date),
            None => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Convert an Excel serial day number to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<chrono::NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let content = std::fs::read(path).map_err(|e| MutabakatError::input_io(path, e))?;
    let text = String::from_utf8_lossy(&content);
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(text);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            MutabakatError::input_io(path, io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
        })?;
        // Cells stay textual; the normalizer decides what is an amount or a date.
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Missing
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(table_from_grid(grid))
}

/// Turkish Excel exports CSV with `;`; everything else uses `,`.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

// ---------------------------------------------------------------------------
// Grid -> Table
// ---------------------------------------------------------------------------

/// Build a table from a cell grid whose first row is the header.
pub(crate) fn table_from_grid(grid: Vec<Vec<Cell>>) -> Table {
    let mut rows = grid.into_iter();
    let Some(header) = rows.next() else {
        return Table::default();
    };
    let mut table = Table::new(header_names(&header));

    for (i, cells) in rows.enumerate() {
        let mut row = Row::new(i + 2);
        for (col, cell) in table.columns.iter().zip(cells) {
            row.insert(col.clone(), cell);
        }
        if !row.is_blank() {
            table.rows.push(row);
        }
    }
    table
}

/// Header texts with blanks named by position and repeats suffixed `.1`, `.2`, ...
fn header_names(header: &[Cell]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, cell) in header.iter().enumerate() {
        let base = match cell.as_text() {
            t if t.is_empty() => format!("Sütun {}", i + 1),
            t => t,
        };
        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_xlsxwriter::{Format, Workbook};

    fn write_xlsx(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("dd.mm.yyyy");
        sheet.write_string(0, 0, "Evrak No").unwrap();
        sheet.write_string(0, 1, "Tarih").unwrap();
        sheet.write_string(0, 2, "Borç").unwrap();
        sheet.write_string(0, 3, "Açıklama").unwrap();
        sheet.write_string(1, 0, "FTR-001").unwrap();
        sheet.write_number_with_format(1, 1, 45301.0, &date_format).unwrap();
        sheet.write_number(1, 2, 100.5).unwrap();
        sheet.write_number(2, 0, 12345.0).unwrap();
        sheet.write_number(2, 2, 75.0).unwrap();
        sheet.write_string(2, 3, "İade").unwrap();
        workbook.save(path).unwrap();
    }

    #[test]
    fn test_load_xlsx_keeps_types_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depo.xlsx");
        write_xlsx(&path);

        let table = load(&path).unwrap();
        assert_eq!(table.columns, vec!["Evrak No", "Tarih", "Borç", "Açıklama"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Evrak No"), &Cell::Text("FTR-001".into()));
        assert_eq!(
            table.rows[0].get("Tarih"),
            &Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );
        assert_eq!(table.rows[0].get("Borç"), &Cell::Number(100.5));
        assert_eq!(table.rows[0].get("Açıklama"), &Cell::Missing);
        assert_eq!(table.rows[1].get("Evrak No").as_text(), "12345");
        assert_eq!(table.rows[1].line, 3);
    }

    #[test]
    fn test_load_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bos.csv");
        std::fs::write(&path, "Evrak No,Borç\n").unwrap();
        let table = load(&path).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_load_csv_semicolon() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eczane.csv");
        std::fs::write(
            &path,
            "Fatura No;Fatura Tutarı;Tarih\nA1;1.234,56;10.01.2024\n;;\nA2;50;\n",
        )
        .unwrap();
        let table = load(&path).unwrap();
        assert_eq!(table.columns, vec!["Fatura No", "Fatura Tutarı", "Tarih"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Fatura Tutarı"), &Cell::Text("1.234,56".into()));
        assert_eq!(table.rows[1].get("Tarih"), &Cell::Missing);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn test_missing_file_is_input_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("yok.xlsx")).unwrap_err();
        assert!(matches!(err, MutabakatError::InputIo { .. }));
        assert!(err.to_string().contains("yok.xlsx"));
    }

    #[test]
    fn test_owner_file_reports_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ekstre.xlsx");
        write_xlsx(&path);
        std::fs::write(dir.path().join("~$ekstre.xlsx"), b"owner").unwrap();
        let err = load(&path).unwrap_err();
        match err {
            MutabakatError::InputLocked { ref path } => assert!(path.contains("ekstre.xlsx")),
            other => panic!("expected InputLocked, got {other:?}"),
        }
        assert!(err.to_string().contains("kapatıp"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ekstre.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        assert!(matches!(
            load(&path).unwrap_err(),
            MutabakatError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn test_header_names_dedupe_and_blank() {
        let header = vec![
            Cell::Text("Tutar".into()),
            Cell::Missing,
            Cell::Text("Tutar".into()),
        ];
        assert_eq!(header_names(&header), vec!["Tutar", "Sütun 2", "Tutar.1"]);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45667.0),
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(-3.0), None);
    }
}
