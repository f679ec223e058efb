//! Manual airport creation.

use serde::{Deserialize, Serialize};

use crate::error::DeskError;

/// Fields of the "add airport" dialog, as typed.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AirportForm {
    #[serde(default)]
    pub icao_code: String,
    #[serde(default)]
    pub iata_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

/// Body of `/add_airport`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NewAirport {
    pub icao_code: String,
    pub iata_code: String,
    pub name: String,
    /// ICAO prefix of the country.
    pub country: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn invalid(msg: &str) -> DeskError {
    DeskError::Validation(msg.to_string())
}

fn coordinate(raw: &str, label: &str, limit: f64) -> Result<Option<f64>, DeskError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= limit => Ok(Some(v)),
        _ => Err(DeskError::Validation(format!(
            "{} must be a number between -{} and {}",
            label, limit, limit
        ))),
    }
}

impl TryFrom<AirportForm> for NewAirport {
    type Error = DeskError;

    fn try_from(form: AirportForm) -> Result<Self, Self::Error> {
        let icao_code = form.icao_code.trim().to_uppercase();
        let iata_code = form.iata_code.trim().to_uppercase();
        let name = form.name.trim().to_uppercase();
        let country = form.country.trim().to_string();
        let kind = match form.kind.trim() {
            "" => "AD".to_string(),
            k => k.to_string(),
        };

        if icao_code.is_empty() {
            return Err(invalid("ICAO code is required"));
        }
        if icao_code.chars().count() != 4 {
            return Err(invalid("ICAO code must be exactly 4 characters"));
        }
        if iata_code.is_empty() {
            return Err(invalid("IATA code is required"));
        }
        if iata_code.chars().count() != 3 {
            return Err(invalid("IATA code must be exactly 3 characters"));
        }
        if name.is_empty() {
            return Err(invalid("Airport name is required"));
        }
        if country.is_empty() {
            return Err(invalid("Country is required"));
        }

        Ok(Self {
            icao_code,
            iata_code,
            name,
            country,
            kind,
            latitude: coordinate(&form.latitude, "Latitude", 90.0)?,
            longitude: coordinate(&form.longitude, "Longitude", 180.0)?,
        })
    }
}
