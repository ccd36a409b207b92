use std::fmt;

use serde::Serialize;

use crate::error::{MutabakatError, Result};
use crate::models::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Invoice,
    Debit,
    Credit,
    Date,
    Type,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Invoice, Role::Debit, Role::Credit, Role::Date, Role::Type];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invoice => write!(f, "Evrak No"),
            Self::Debit => write!(f, "Borç"),
            Self::Credit => write!(f, "Alacak"),
            Self::Date => write!(f, "Tarih"),
            Self::Type => write!(f, "Tip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Role catalog
// ---------------------------------------------------------------------------

/// Ordered header synonyms per role. Earlier candidates win.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleCatalog {
    pub invoice: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub date: Vec<String>,
    pub kind: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

const INVOICE_NAMES: &[&str] = &[
    "Evrak No", "Fatura No", "Belge No", "Fiş No", "Evrak Numarası", "Fatura Numarası",
    "Belge Numarası", "Fiş Numarası", "Invoice No", "Document No",
];

const DATE_NAMES: &[&str] = &[
    "Tarih", "Evrak Tarihi", "Fatura Tarihi", "Belge Tarihi", "İşlem Tarihi", "Fiş Tarihi", "Date",
];

const TYPE_NAMES: &[&str] = &[
    "Tip", "Tür", "Evrak Tipi", "Evrak Türü", "Belge Türü", "İşlem Tipi", "İşlem Türü", "Fiş Tipi",
    "Açıklama", "Type",
];

const CREDIT_NAMES: &[&str] = &[
    "Alacak", "İade", "Çıkış", "İade/Çık Tut", "Alacak Tutarı", "İade Tutarı", "Credit",
];

impl RoleCatalog {
    /// Catalog for wholesaler account statements (Borç/Alacak layout).
    pub fn depo() -> Self {
        Self {
            invoice: owned(INVOICE_NAMES),
            debit: owned(&[
                "Borç", "Borç Tutarı", "Tutar", "Fatura Tutarı", "Net Tutar", "Toplam", "Debit",
                "Amount",
            ]),
            credit: owned(CREDIT_NAMES),
            date: owned(DATE_NAMES),
            kind: owned(TYPE_NAMES),
        }
    }

    /// Catalog for the pharmacy's own purchase ledger export.
    pub fn eczane() -> Self {
        Self {
            invoice: owned(INVOICE_NAMES),
            debit: owned(&[
                "Fatura Tutarı", "Borç", "Tutar", "Net Tutar", "Toplam", "Genel Toplam", "Debit",
                "Amount",
            ]),
            credit: owned(&[
                "İade/Çık Tut", "Alacak", "İade", "Çıkış", "İade Tutarı", "Alacak Tutarı", "Credit",
            ]),
            date: owned(DATE_NAMES),
            kind: owned(TYPE_NAMES),
        }
    }

    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Depo => Self::depo(),
            Side::Eczane => Self::eczane(),
        }
    }

    pub fn candidates(&self, role: Role) -> &[String] {
        match role {
            Role::Invoice => &self.invoice,
            Role::Debit => &self.debit,
            Role::Credit => &self.credit,
            Role::Date => &self.date,
            Role::Type => &self.kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaMapping {
    pub invoice_col: Option<String>,
    pub debit_col: Option<String>,
    pub credit_col: Option<String>,
    pub date_col: Option<String>,
    pub type_col: Option<String>,
}

impl SchemaMapping {
    pub fn column(&self, role: Role) -> Option<&str> {
        match role {
            Role::Invoice => self.invoice_col.as_deref(),
            Role::Debit => self.debit_col.as_deref(),
            Role::Credit => self.credit_col.as_deref(),
            Role::Date => self.date_col.as_deref(),
            Role::Type => self.type_col.as_deref(),
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Invoice => &mut self.invoice_col,
            Role::Debit => &mut self.debit_col,
            Role::Credit => &mut self.credit_col,
            Role::Date => &mut self.date_col,
            Role::Type => &mut self.type_col,
        }
    }

    /// The invoice column, or `SchemaUnresolved` carrying every column name.
    pub fn require_invoice(&self, side: Side, columns: &[String]) -> Result<&str> {
        self.invoice_col
            .as_deref()
            .ok_or_else(|| MutabakatError::SchemaUnresolved {
                side,
                columns: columns.to_vec(),
            })
    }

    /// Amount roles that resolved to nothing.
    pub fn missing_amount_roles(&self) -> Vec<Role> {
        [Role::Debit, Role::Credit]
            .into_iter()
            .filter(|role| self.column(*role).is_none())
            .collect()
    }
}

/// Resolve every role of `catalog` against the given header names.
///
/// All roles try their exact synonyms first, in [`Role::ALL`] order; the
/// roles still unresolved then try the normalized pass. A column taken by
/// one role is not offered to another, so an exact hit always outranks a
/// different role's fuzzy one.
pub fn resolve(columns: &[String], catalog: &RoleCatalog) -> SchemaMapping {
    let passes: [fn(&[String], &[String]) -> Option<String>; 2] = [exact_match, fuzzy_match];
    let mut mapping = SchemaMapping::default();
    let mut free: Vec<String> = columns.to_vec();
    for pass in passes {
        for role in Role::ALL {
            if mapping.column(role).is_some() {
                continue;
            }
            let Some(col) = pass(&free, catalog.candidates(role)) else {
                continue;
            };
            free.retain(|c| *c != col);
            *mapping.slot_mut(role) = Some(col);
        }
    }
    mapping
}

/// Exact match on any candidate first; then a normalized substring match
/// in either direction, candidates still taken in order.
pub fn resolve_role(columns: &[String], candidates: &[String]) -> Option<String> {
    exact_match(columns, candidates).or_else(|| fuzzy_match(columns, candidates))
}

fn exact_match(columns: &[String], candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| columns.iter().find(|c| *c == candidate))
        .cloned()
}

fn fuzzy_match(columns: &[String], candidates: &[String]) -> Option<String> {
    let normalized: Vec<(String, &String)> = columns
        .iter()
        .map(|c| (normalize_header(c), c))
        .filter(|(n, _)| !n.is_empty())
        .collect();
    for candidate in candidates {
        let wanted = normalize_header(candidate);
        if wanted.is_empty() {
            continue;
        }
        if let Some((_, col)) = normalized
            .iter()
            .find(|(n, _)| n.contains(&wanted) || wanted.contains(n.as_str()))
        {
            return Some((*col).clone());
        }
    }
    None
}

/// Lowercase and drop spaces, underscores and slashes.
///
/// The combining dot left behind by lowercasing `İ` is dropped too, so
/// `İADE` and `IADE` normalize alike.
pub fn normalize_header(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '/' | '\u{307}'))
        .collect()
}
