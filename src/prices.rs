//! Price table editing: input validation and the cached list of the
//! active year.

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::DeskError;
use crate::models::{LegacyPrice, PdfImportReport, PriceEntry};

/// Oldest and newest year a price table may be duplicated to.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 2020..=2100;

/// How many missing countries are named after a PDF import.
const MISSING_COUNTRIES_SHOWN: usize = 5;

/// Parses a price typed by the operator; it must be a finite number >= 0.
pub fn parse_price(raw: &str) -> Result<f64, DeskError> {
    match raw.trim().parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(DeskError::Validation("Invalid price".into())),
    }
}

fn require_prefix(raw: &str) -> Result<String, DeskError> {
    let prefix = raw.trim().to_uppercase();
    if prefix.is_empty() {
        return Err(DeskError::Validation("ICAO prefix is required".into()));
    }
    Ok(prefix)
}

fn parse_valid_from(raw: &str) -> Result<Option<String>, DeskError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| Some(d.format("%Y-%m-%d").to_string()))
        .map_err(|_| DeskError::Validation(format!("Invalid start date: {}", raw)))
}

/// Form of the "add period" dialog.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PeriodForm {
    #[serde(default)]
    pub icao_prefix: String,
    #[serde(default)]
    pub valid_from: String,
    #[serde(default)]
    pub price: String,
}

/// Body of `/add_price_period`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewPeriod {
    pub icao_prefix: String,
    pub year: i32,
    pub price: f64,
    pub valid_from: Option<String>,
}

impl NewPeriod {
    pub fn parse(form: &PeriodForm, year: i32) -> Result<Self, DeskError> {
        let icao_prefix = require_prefix(&form.icao_prefix)?;
        let price = parse_price(&form.price)?;
        let valid_from = parse_valid_from(&form.valid_from)?;
        Ok(Self {
            icao_prefix,
            year,
            price,
            valid_from,
        })
    }
}

/// Form of the delete button next to a period.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeletePeriodForm {
    #[serde(default)]
    pub icao_prefix: String,
    #[serde(default)]
    pub valid_from: String,
}

/// Body of `/delete_price_period`; `valid_from == None` targets the
/// default price.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PeriodKey {
    pub icao_prefix: String,
    pub year: i32,
    pub valid_from: Option<String>,
}

impl PeriodKey {
    pub fn parse(form: &DeletePeriodForm, year: i32) -> Result<Self, DeskError> {
        Ok(Self {
            icao_prefix: require_prefix(&form.icao_prefix)?,
            year,
            valid_from: parse_valid_from(&form.valid_from)?,
        })
    }
}

/// Form of the legacy "edit price" dialog.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PriceForm {
    #[serde(default)]
    pub icao_prefix: String,
    #[serde(default)]
    pub price: String,
}

/// Body of `/update_price`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PriceUpdate {
    pub icao_prefix: String,
    pub year: i32,
    pub price: f64,
}

impl PriceUpdate {
    pub fn parse(form: &PriceForm, year: i32) -> Result<Self, DeskError> {
        Ok(Self {
            icao_prefix: require_prefix(&form.icao_prefix)?,
            year,
            price: parse_price(&form.price)?,
        })
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DuplicateForm {
    #[serde(default)]
    pub target_year: String,
}

/// Body of `/duplicate_year`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct YearCopy {
    pub source_year: i32,
    pub target_year: i32,
}

impl YearCopy {
    pub fn parse(form: &DuplicateForm, source_year: i32) -> Result<Self, DeskError> {
        match form.target_year.trim().parse::<i32>() {
            Ok(target_year) if YEAR_RANGE.contains(&target_year) => Ok(Self {
                source_year,
                target_year,
            }),
            _ => Err(DeskError::Validation("Invalid year".into())),
        }
    }
}

/// Backend years plus the current one, newest first, without duplicates.
pub fn year_choices(years: &[i32], current: i32) -> Vec<i32> {
    years
        .iter()
        .copied()
        .chain(std::iter::once(current))
        .sorted_unstable_by(|a, b| b.cmp(a))
        .dedup()
        .collect()
}

/// Label of a period: its start date, or the default price.
pub fn period_label(valid_from: Option<&str>) -> String {
    match valid_from {
        None => "Default price".to_string(),
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => format!("from {}", date.format("%d/%m/%Y")),
            Err(_) => format!("from {}", raw),
        },
    }
}

/// Notification text after a PDF scale import.
pub fn pdf_import_message(report: &PdfImportReport, year: i32) -> String {
    let message = if report.message.is_empty() {
        format!("{} prices imported for {}", report.imported, year)
    } else {
        report.message.clone()
    };
    let missing = &report.missing_countries;
    if missing.is_empty() {
        return message;
    }
    let mut text = format!(
        "{} - Countries not found: {}",
        message,
        missing.iter().take(MISSING_COUNTRIES_SHOWN).join(", ")
    );
    if missing.len() > MISSING_COUNTRIES_SHOWN {
        text.push_str(&format!(
            " ... and {} others",
            missing.len() - MISSING_COUNTRIES_SHOWN
        ));
    }
    text
}

/// Which shape the cached price list came in.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceTable {
    Periods(Vec<PriceEntry>),
    Legacy(Vec<LegacyPrice>),
}

/// Price list of the active year, as last fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricesView {
    year: Option<i32>,
    table: Option<PriceTable>,
    search: String,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

impl PricesView {
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Year the operator is working on, falling back to `default`.
    pub fn year_or(&self, default: i32) -> i32 {
        self.year.unwrap_or(default)
    }

    /// Picks the newest year the first time the pane is opened; later visits
    /// keep whatever the operator selected.
    pub fn settle_year(&mut self, choices: &[i32], current: i32) -> i32 {
        let year = *self
            .year
            .get_or_insert_with(|| choices.first().copied().unwrap_or(current));
        year
    }

    pub fn select_year(&mut self, year: i32) {
        if self.year != Some(year) {
            self.table = None;
        }
        self.year = Some(year);
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
    }

    pub fn replace(&mut self, table: PriceTable) {
        self.table = Some(table);
    }

    pub fn table(&self) -> Option<&PriceTable> {
        self.table.as_ref()
    }

    /// Period entries matching the search term on country or prefix.
    pub fn visible_entries(&self) -> Vec<&PriceEntry> {
        let term = self.search.to_lowercase();
        match self.table {
            Some(PriceTable::Periods(ref entries)) => entries
                .iter()
                .filter(|e| {
                    term.is_empty()
                        || contains_ci(e.country.as_deref(), &term)
                        || contains_ci(Some(&e.icao_prefix), &term)
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Legacy rows matching the search term on country or prefix.
    pub fn visible_legacy(&self) -> Vec<&LegacyPrice> {
        let term = self.search.to_lowercase();
        match self.table {
            Some(PriceTable::Legacy(ref rows)) => rows
                .iter()
                .filter(|p| {
                    term.is_empty()
                        || contains_ci(p.country.as_deref(), &term)
                        || contains_ci(Some(&p.icao_prefix), &term)
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
