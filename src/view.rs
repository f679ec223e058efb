//! Display rows built from desk state for the page templates.

use serde::Serialize;

use crate::models::{Airport, Flight, LegacyPrice, PriceEntry, Rotation, Summary};
use crate::pagination::AirportPager;
use crate::prices::period_label;
use crate::workflow::Workflow;

fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CountryRow {
    pub pays: String,
    pub count: usize,
    pub total: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryView {
    pub nb_rotations: usize,
    pub nb_vols: usize,
    pub total: String,
    pub nb_problemes: usize,
    pub countries: Vec<CountryRow>,
}

impl From<&Summary> for SummaryView {
    fn from(summary: &Summary) -> Self {
        Self {
            nb_rotations: summary.nb_rotations,
            nb_vols: summary.nb_vols,
            total: money(summary.total_indemnites),
            nb_problemes: summary.nb_problemes,
            countries: summary
                .pays_details
                .iter()
                .map(|c| CountryRow {
                    pays: c.pays.clone(),
                    count: c.count,
                    total: money(c.total),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FlightLine {
    pub text: String,
    pub diagnostic: Option<String>,
}

/// One line of the rotation tree: a flight or a day without flight.
pub fn flight_line(flight: &Flight) -> FlightLine {
    let mut text = if flight.jour_sans_vol {
        format!(
            "{} - No flight - {} - {} EUR",
            flight.date,
            flight.ades,
            money(flight.indemnite)
        )
    } else {
        format!(
            "{} - {} - {} → {} - {} EUR",
            flight.date,
            flight.flight_no,
            flight.adep,
            flight.ades,
            money(flight.indemnite)
        )
    };
    if let Some(ref pays) = flight.pays {
        text.push_str(&format!(" ({})", pays));
    }
    FlightLine {
        text,
        diagnostic: flight.diagnostic.clone(),
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RotationRow {
    pub id: String,
    pub total: String,
    pub has_problems: bool,
    pub flights: Vec<FlightLine>,
}

impl From<&Rotation> for RotationRow {
    fn from(rotation: &Rotation) -> Self {
        Self {
            id: rotation.id.clone(),
            total: money(rotation.total),
            has_problems: rotation.has_problems(),
            flights: rotation.vols.iter().map(flight_line).collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PeriodRow {
    pub label: String,
    /// Start date as sent back by the delete form; empty for the default.
    pub valid_from: String,
    pub price: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PriceRow {
    pub icao_prefix: String,
    pub country: String,
    pub zone: String,
    pub periods: Vec<PeriodRow>,
}

impl From<&PriceEntry> for PriceRow {
    fn from(entry: &PriceEntry) -> Self {
        Self {
            icao_prefix: entry.icao_prefix.clone(),
            country: entry.country.clone().unwrap_or_else(|| "N/A".into()),
            zone: entry.zone.clone().unwrap_or_default(),
            periods: entry
                .periods
                .iter()
                .map(|p| PeriodRow {
                    label: period_label(p.valid_from.as_deref()),
                    valid_from: p.valid_from.clone().unwrap_or_default(),
                    price: format!("{:.0}", p.price),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LegacyRow {
    pub icao_prefix: String,
    pub country: String,
    pub zone: String,
    pub price: String,
    /// Raw value pre-filled in the edit form.
    pub raw_price: f64,
}

impl From<&LegacyPrice> for LegacyRow {
    fn from(price: &LegacyPrice) -> Self {
        Self {
            icao_prefix: price.icao_prefix.clone(),
            country: price.country.clone().unwrap_or_else(|| "N/A".into()),
            zone: price.zone.clone().unwrap_or_default(),
            price: money(price.price),
            raw_price: price.price,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AirportRow {
    pub icao_code: String,
    pub iata_code: String,
    pub name: String,
    pub country: String,
    pub kind: String,
    pub latitude: String,
    pub longitude: String,
}

impl From<&Airport> for AirportRow {
    fn from(airport: &Airport) -> Self {
        Self {
            icao_code: airport.icao_code.clone(),
            iata_code: if airport.iata_code.is_empty() {
                "-".into()
            } else {
                airport.iata_code.clone()
            },
            name: airport.name.clone(),
            country: airport
                .country_name
                .clone()
                .unwrap_or_else(|| airport.country.clone()),
            kind: airport.kind.clone(),
            latitude: format!("{:.4}", airport.latitude),
            longitude: format!("{:.4}", airport.longitude),
        }
    }
}

/// Pager controls of the airports pane.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PagerView {
    pub page: usize,
    pub last_page: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub count_label: String,
}

impl From<&AirportPager> for PagerView {
    fn from(pager: &AirportPager) -> Self {
        let total = pager.total();
        let count_label = match total {
            0 => String::new(),
            1 => "(1 airport)".to_string(),
            n => format!("({} airports)", n),
        };
        Self {
            page: pager.page(),
            last_page: pager.last_page(),
            total,
            has_prev: pager.has_prev(),
            has_next: pager.has_next(),
            count_label,
        }
    }
}

/// Upload/process/export controls of the processing pane.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct WorkflowView {
    pub stage: String,
    pub file_name: Option<String>,
    pub can_process: bool,
    pub can_export: bool,
    pub busy: Option<&'static str>,
}

impl From<&Workflow> for WorkflowView {
    fn from(workflow: &Workflow) -> Self {
        Self {
            stage: workflow.stage().to_string(),
            file_name: workflow.display_name().map(str::to_string),
            can_process: workflow.can_process(),
            can_export: workflow.can_export(),
            busy: workflow.in_flight().map(|op| op.label()),
        }
    }
}
