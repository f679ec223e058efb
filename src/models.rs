//! Data models for the payloads exchanged with the indemnity backend.
//!
//! Every reply of the backend is a JSON object carrying `success` and an
//! optional `message`; the typed payloads below are decoded from the same
//! object once [`Ack::success`] has been checked.

use serde::{Deserialize, Deserializer, Serialize};

/// Envelope shared by all backend replies.
#[derive(Debug, Deserialize, Clone)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Deserializes a string, mapping `""` (and `null`) to `None`.
pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Ok(Some(s)),
    }
}

/// One flight of a rotation, or a day without flight.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Flight {
    /// Day of the flight, `DD-MM-YYYY`.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub flight_no: String,
    #[serde(default)]
    pub adep: String,
    #[serde(default)]
    pub ades: String,
    #[serde(default)]
    pub off: String,
    #[serde(default)]
    pub on: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub indemnite: f64,
    /// Country the allowance was computed for.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub pays: Option<String>,
    /// Warning raised by the backend for this line.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub diagnostic: Option<String>,
    #[serde(default)]
    pub jour_sans_vol: bool,
}

/// A crew duty cycle with its aggregate allowance.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Rotation {
    pub id: String,
    pub total: f64,
    #[serde(default)]
    pub vols: Vec<Flight>,
}

impl Rotation {
    /// Departure of the first flight, the rotation's outbound base.
    pub fn first_departure(&self) -> Option<&str> {
        self.vols.first().map(|v| v.adep.as_str())
    }

    /// Arrival of the last flight, the rotation's inbound base.
    pub fn last_arrival(&self) -> Option<&str> {
        self.vols.last().map(|v| v.ades.as_str())
    }

    pub fn has_problems(&self) -> bool {
        self.vols.iter().any(|v| v.diagnostic.is_some())
    }
}

/// Allowance count and total for one country.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CountryTotal {
    pub pays: String,
    pub count: usize,
    pub total: f64,
}

/// Totals computed by the backend for a processed roster.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Summary {
    pub total_indemnites: f64,
    pub nb_rotations: usize,
    pub nb_vols: usize,
    #[serde(default)]
    pub nb_problemes: usize,
    #[serde(default)]
    pub pays_details: Vec<CountryTotal>,
}

/// Reply of `/upload_excel`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub nb_vols: usize,
}

/// Reply of `/process_file`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct ProcessOutcome {
    pub summary: Summary,
    #[serde(default)]
    pub rotations: Vec<Rotation>,
}

/// A price validity window; `valid_from == None` is the default price.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PricePeriod {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub valid_from: Option<String>,
    pub price: f64,
}

/// Price table row for one ICAO prefix with all its periods.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PriceEntry {
    pub icao_prefix: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub zone: Option<String>,
    #[serde(default)]
    pub periods: Vec<PricePeriod>,
}

/// Single yearly price, as served by `/get_prices/{year}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LegacyPrice {
    pub icao_prefix: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub zone: Option<String>,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceList<T> {
    pub prices: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct YearList {
    pub years: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BaseList {
    pub bases: Vec<String>,
}

/// Reply of `/import_pdf_baremes`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct PdfImportReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub imported: usize,
    #[serde(default)]
    pub missing_countries: Vec<String>,
}

/// Airport reference record, keyed by `icao_code`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Airport {
    pub icao_code: String,
    #[serde(default)]
    pub iata_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub country_name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

/// One page of `/search_airports`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct AirportPage {
    pub airports: Vec<Airport>,
    pub total: usize,
}

/// Country choice for the add-airport form.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Country {
    pub icao_prefix: String,
    #[serde(default)]
    pub country_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountryList {
    pub countries: Vec<Country>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

/// Reply of `/get_airport_stats`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AirportStats {
    pub total: usize,
    #[serde(default)]
    pub types: Vec<TypeCount>,
    #[serde(default)]
    pub countries: Vec<CountryCount>,
}

/// A binary document produced by the backend, ready to be handed to the
/// browser as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_empty_optionals_become_none() {
        let flight: Flight = serde_json::from_str(
            r#"{"date":"10-03-2024","adep":"LFLY","ades":"LEMD","indemnite":54.0,
                "pays":"","diagnostic":"","flight_no":"AB123","jour_sans_vol":false}"#,
        )
        .unwrap();
        assert_eq!(flight.pays, None);
        assert_eq!(flight.diagnostic, None);
        assert_eq!(flight.flight_no, "AB123");
    }

    #[test]
    fn test_rotation_endpoints_and_problems() {
        let rotation: Rotation = serde_json::from_str(
            r#"{"id":"R1","total":120.5,"vols":[
                {"date":"10-03-2024","adep":"LFLY","ades":"LEMD","indemnite":60.0},
                {"date":"11-03-2024","adep":"LEMD","ades":"LFLY","indemnite":60.5,
                 "diagnostic":"Prix manquant"}]}"#,
        )
        .unwrap();
        assert_eq!(rotation.first_departure(), Some("LFLY"));
        assert_eq!(rotation.last_arrival(), Some("LFLY"));
        assert!(rotation.has_problems());
    }

    #[test]
    fn test_airport_type_field_is_renamed() {
        let airport: Airport = serde_json::from_str(
            r#"{"icao_code":"LFLY","iata_code":"LYN","name":"LYON BRON","country":"LF",
                "country_name":"France","type":"AD","latitude":45.72,"longitude":4.94}"#,
        )
        .unwrap();
        assert_eq!(airport.kind, "AD");
        assert_eq!(airport.country_name.as_deref(), Some("France"));
    }

    #[test]
    fn test_default_period_has_no_start() {
        let entry: PriceEntry = serde_json::from_str(
            r#"{"icao_prefix":"LE","country":"Espagne","zone":null,
                "periods":[{"valid_from":null,"price":60},{"valid_from":"2024-04-01","price":65}]}"#,
        )
        .unwrap();
        assert_eq!(entry.zone, None);
        assert_eq!(entry.periods[0].valid_from, None);
        assert_eq!(entry.periods[1].valid_from.as_deref(), Some("2024-04-01"));
    }
}
