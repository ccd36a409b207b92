use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, Settings};

pub fn show() -> Result<()> {
    println!("Ayar dosyası: {}", settings_path().display());
    println!("{}", format_settings(&load_settings()));
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.set(key, value)?;
    save_settings(&settings)?;
    println!("{key} güncellendi.");
    Ok(())
}

pub fn format_settings(settings: &Settings) -> String {
    let policy = serde_json::to_value(settings.duplicate_policy)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let mut table = Table::new();
    table.set_header(vec!["Ayar", "Değer"]);
    table.add_row(vec![
        Cell::new("filter_file"),
        Cell::new(settings.filter_file.as_deref().unwrap_or("(program klasörü)")),
    ]);
    table.add_row(vec![Cell::new("duplicate_policy"), Cell::new(policy)]);
    table.add_row(vec![
        Cell::new("export_dir"),
        Cell::new(settings.export_dir.as_deref().unwrap_or("-")),
    ]);
    table.to_string()
}
