use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::loader;
use crate::models::Side;
use crate::schema::{resolve, Role, RoleCatalog, SchemaMapping};

pub fn run(file: &Path, side: Side) -> Result<()> {
    let table = loader::load(file)?;
    let mapping = resolve(&table.columns, &RoleCatalog::for_side(side));
    println!("{}", format_columns(side, &table.columns, table.rows.len(), &mapping));
    Ok(())
}

pub fn format_columns(side: Side, columns: &[String], rows: usize, mapping: &SchemaMapping) -> String {
    let mut roles = Table::new();
    roles.set_header(vec!["Rol", "Sütun"]);
    for role in Role::ALL {
        let col = match mapping.column(role) {
            Some(c) => Cell::new(c.green()),
            None if role == Role::Invoice => Cell::new("bulunamadı".red().bold()),
            None => Cell::new("-".dimmed()),
        };
        roles.add_row(vec![Cell::new(role), col]);
    }

    let mut all = Table::new();
    all.set_header(vec!["#", "Sütun"]);
    for (i, name) in columns.iter().enumerate() {
        all.add_row(vec![Cell::new(i + 1), Cell::new(name)]);
    }

    format!("{side} dosyası: {rows} satır\n{roles}\n\nSütunlar\n{all}")
}
