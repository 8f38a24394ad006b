//! In-memory report data
//!
//! `ReportModel` is plain data. All edits go through
//! [`FormEditor`](crate::editor::FormEditor), which returns a fresh value
//! for every change.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ValidationRejection;

pub const DEFAULT_TITLE: &str = "LAPORAN HARIAN COLLECTION";
pub const DEFAULT_COMPANY: &str = "PT. BPR BANK BULUNGAN (Perseroda)";
pub const DEFAULT_ADDRESS: &str = "KANTOR PUSAT";

/// A quantity or summary value: either a number or free text.
///
/// Text is kept verbatim for display and coerced with [`Amount::value`]
/// only when totals are computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Count(u64),
    Text(String),
}

impl Amount {
    /// Numeric value used for aggregation. Text contributes its leading
    /// digits, so `"12 lembar"` counts as 12 and `"abc"` or `"-3"` as 0.
    pub fn value(&self) -> u64 {
        match self {
            Amount::Count(n) => *n,
            Amount::Text(s) => {
                let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    0
                } else {
                    digits.parse().unwrap_or(u64::MAX)
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Amount::Text(s) if s.trim().is_empty())
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Count(0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Count(n) => write!(f, "{}", n),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the report body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Amount,
    /// Embedded `data:` URI; never a file system reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: String::new(),
            quantity: Amount::Count(0),
            image: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBlock {
    #[serde(default)]
    pub total: Amount,
    #[serde(default)]
    pub deposits: Amount,
    #[serde(default)]
    pub recommendations: Amount,
}

/// The complete description of one report instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportModel {
    pub title: String,
    pub company: String,
    pub address: String,
    pub period: String,
    pub employee: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub summary: SummaryBlock,
}

impl ReportModel {
    /// A fresh session model: default heading, the given day as period, no
    /// items and zeroed summary.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            company: DEFAULT_COMPANY.to_string(),
            address: DEFAULT_ADDRESS.to_string(),
            period: long_date_id(today),
            employee: String::new(),
            items: Vec::new(),
            summary: SummaryBlock::default(),
        }
    }

    pub fn item(&self, id: u64) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Sum of all item quantities (non-numeric text counts as 0).
    pub fn quantity_total(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.quantity.value()))
    }

    pub fn max_item_id(&self) -> Option<u64> {
        self.items.iter().map(|item| item.id).max()
    }
}

impl Default for ReportModel {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

/// Report-level fields addressable by `FormEditor::update_field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportField {
    Title,
    Company,
    Address,
    Period,
    Employee,
    Total,
    Deposits,
    Recommendations,
}

impl ReportField {
    pub fn name(self) -> &'static str {
        match self {
            ReportField::Title => "title",
            ReportField::Company => "company",
            ReportField::Address => "address",
            ReportField::Period => "period",
            ReportField::Employee => "employee",
            ReportField::Total => "total",
            ReportField::Deposits => "deposits",
            ReportField::Recommendations => "recommendations",
        }
    }
}

impl FromStr for ReportField {
    type Err = ValidationRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "title" => ReportField::Title,
            "company" => ReportField::Company,
            "address" => ReportField::Address,
            "period" => ReportField::Period,
            "employee" => ReportField::Employee,
            "total" => ReportField::Total,
            "deposits" => ReportField::Deposits,
            "recommendations" => ReportField::Recommendations,
            _ => return Err(ValidationRejection::UnknownField(s.to_string())),
        })
    }
}

/// Item fields addressable by `FormEditor::update_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Quantity,
}

impl FromStr for ItemField {
    type Err = ValidationRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(ItemField::Name),
            "quantity" => Ok(ItemField::Quantity),
            _ => Err(ValidationRejection::UnknownField(s.to_string())),
        }
    }
}

const WEEKDAYS_ID: [&str; 7] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu"];
const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Indonesian long date, e.g. `Jumat, 16 Oktober 2026`.
pub fn long_date_id(date: NaiveDate) -> String {
    format!(
        "{}, {} {} {}",
        WEEKDAYS_ID[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS_ID[date.month0() as usize],
        date.year()
    )
}

/// Indonesian short timestamp, e.g. `16/10/2026, 14.03.21`.
pub fn timestamp_id(at: NaiveDateTime) -> String {
    format!(
        "{:02}/{:02}/{}, {:02}.{:02}.{:02}",
        at.day(),
        at.month(),
        at.year(),
        at.hour(),
        at.minute(),
        at.second()
    )
}
