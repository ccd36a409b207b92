use thiserror::Error;

use crate::models::Side;

#[derive(Error, Debug)]
pub enum MutabakatError {
    #[error("Dosya okunamadı: {path}: {source}")]
    InputIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dosya başka bir program tarafından açık: {path} (Excel'de açıksa kapatıp tekrar deneyin)")]
    InputLocked { path: String },

    #[error("{side} dosyasında fatura/evrak numarası sütunu bulunamadı. Mevcut sütunlar: {}", columns.join(", "))]
    SchemaUnresolved { side: Side, columns: Vec<String> },

    #[error("Filtre dosyası okunamadı: {path}: {reason}")]
    FilterStoreIo { path: String, reason: String },

    #[error("{side} dosyasında tekrarlanan evrak numarası: {id}")]
    DuplicateInvoice { side: Side, id: String },

    #[error("Desteklenmeyen dosya türü: {0}")]
    UnsupportedFormat(String),

    #[error("Excel çıktısı yazılamadı: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON hatası: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ayar hatası: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MutabakatError {
    pub(crate) fn input_io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::InputIo {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MutabakatError>;
