use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_filter_store, read_filters};
use crate::error::Result;
use crate::filters::{filter_candidates, FilterCandidate, FilterSet, FilterStore};
use crate::loader;
use crate::models::Side;

pub fn show(filters_override: Option<&Path>) -> Result<()> {
    let (store, filters) = read_filters(filters_override)?;
    println!("Filtre dosyası: {}", store.path().display());
    println!("{}", format_rules(&filters));
    Ok(())
}

pub fn candidates(file: &Path, side: Side) -> Result<()> {
    let table = loader::load(file)?;
    let found = filter_candidates(&table);
    if found.is_empty() {
        println!("{side} dosyasında filtrelenebilir sütun yok.");
    } else {
        println!("{}", format_candidates(side, &found));
    }
    Ok(())
}

pub fn add(filters_override: Option<&Path>, side: Side, column: &str, values: &[String]) -> Result<()> {
    let (store, mut filters) = open_filter_store(filters_override)?;
    for value in values {
        if filters.add(side, column, value) {
            println!("Eklendi: {side} / {column} = '{}'", value.trim());
        } else {
            println!("Zaten var: {side} / {column} = '{}'", value.trim());
        }
    }
    persist(&store, &filters)
}

pub fn remove(
    filters_override: Option<&Path>,
    side: Side,
    column: &str,
    value: Option<&str>,
) -> Result<()> {
    let (store, mut filters) = open_filter_store(filters_override)?;
    if !filters.remove(side, column, value) {
        println!("Böyle bir filtre yok: {side} / {column}");
        return Ok(());
    }
    match value {
        Some(v) => println!("Kaldırıldı: {side} / {column} = '{}'", v.trim()),
        None => println!("Kaldırıldı: {side} / {column} (tüm değerler)"),
    }
    persist(&store, &filters)
}

pub fn clear(filters_override: Option<&Path>, side: Option<Side>) -> Result<()> {
    let (store, mut filters) = open_filter_store(filters_override)?;
    filters.clear(side);
    match side {
        Some(side) => println!("{side} filtreleri temizlendi."),
        None => println!("Tüm filtreler temizlendi."),
    }
    persist(&store, &filters)
}

/// Toggling the flag is always written, whatever its old value was.
pub fn remember(filters_override: Option<&Path>, on: bool) -> Result<()> {
    let (store, mut filters) = open_filter_store(filters_override)?;
    filters.hatirla = on;
    store.save(&filters)?;
    if on {
        println!("Filtre değişiklikleri kaydedilecek.");
    } else {
        println!("Filtre değişiklikleri kaydedilmeyecek.");
    }
    Ok(())
}

fn persist(store: &FilterStore, filters: &FilterSet) -> Result<()> {
    if filters.hatirla {
        store.save(filters)?;
        tracing::debug!(path = %store.path().display(), "saved filter file");
    } else {
        println!(
            "{}",
            "Hatırlama kapalı: değişiklik dosyaya yazılmadı (filters remember on).".yellow()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions
// ---------------------------------------------------------------------------

pub fn format_rules(filters: &FilterSet) -> String {
    if filters.is_empty() {
        return "Tanımlı filtre yok.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Taraf", "Sütun", "Hariç tutulan değerler"]);
    for side in Side::ALL {
        for (column, values) in filters.rules(side) {
            table.add_row(vec![
                Cell::new(side),
                Cell::new(column),
                Cell::new(values.join(", ")),
            ]);
        }
    }
    let remember = if filters.hatirla { "açık" } else { "kapalı" };
    format!("Filtreler (hatırla: {remember})\n{table}")
}

pub fn format_candidates(side: Side, found: &[FilterCandidate]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Sütun", "Değer sayısı", "Değerler"]);
    for c in found {
        table.add_row(vec![
            Cell::new(&c.column),
            Cell::new(c.values.len()),
            Cell::new(c.values.join(", ")),
        ]);
    }
    format!("{side} için filtrelenebilir sütunlar\n{table}")
}
