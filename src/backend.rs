//! HTTP client for the indemnity backend.
//!
//! Every JSON reply carries `{success, message?}`; [`BackendClient`] checks
//! the envelope and turns `success: false` into [`DeskError::Rejected`] so
//! callers only see typed payloads.

use std::time::Duration;

use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::airports::NewAirport;
use crate::error::DeskError;
use crate::models::{
    Ack, AirportPage, AirportStats, BaseList, Country, CountryList, Download, LegacyPrice,
    PdfImportReport, PriceEntry, PriceList, ProcessOutcome, UploadReceipt, YearList,
};
use crate::pagination::AirportQuery;
use crate::prices::{NewPeriod, PeriodKey, PriceTable, PriceUpdate, YearCopy};

const USER_AGENT: &str = concat!("crewdesk/", env!("CARGO_PKG_VERSION"));

/// A file received from the operator, forwarded as a multipart part.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    fn part(self) -> Part {
        Part::bytes(self.bytes).file_name(self.name)
    }
}

/// Extracts the file name of an `attachment; filename="..."` header.
fn attachment_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, DeskError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Checks the envelope, then decodes the payload from the same object.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DeskError> {
        let value: Value = response.json().await?;
        let ack: Ack = serde_json::from_value(value.clone())?;
        if !ack.success {
            return Err(DeskError::Rejected(
                ack.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DeskError> {
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeskError> {
        tracing::debug!(path, "GET backend");
        Self::send(self.client.get(self.url(path))).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeskError> {
        tracing::debug!(path, "POST backend");
        Self::send(self.client.post(self.url(path)).json(body)).await
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, DeskError> {
        tracing::debug!(path, "POST multipart backend");
        Self::send(self.client.post(self.url(path)).multipart(form)).await
    }

    /// Sends a request whose successful reply is a binary document.
    async fn download(request: RequestBuilder, fallback_name: String) -> Result<Download, DeskError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(match serde_json::from_str::<Ack>(&body) {
                Ok(Ack {
                    message: Some(message),
                    ..
                }) => DeskError::Rejected(message),
                _ => DeskError::InvalidApiResponse(format!("backend answered {}", status)),
            });
        }

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type =
            header(CONTENT_TYPE).unwrap_or_else(|| "application/octet-stream".to_string());
        let filename = header(CONTENT_DISPOSITION)
            .as_deref()
            .and_then(attachment_name)
            .unwrap_or(fallback_name);

        let body = response.bytes().await?.to_vec();
        Ok(Download {
            filename,
            content_type,
            body,
        })
    }

    pub async fn available_years(&self) -> Result<Vec<i32>, DeskError> {
        let list: YearList = self.get_json("get_available_years").await?;
        Ok(list.years)
    }

    pub async fn config(&self) -> Result<Vec<String>, DeskError> {
        let list: BaseList = self.get_json("get_config").await?;
        Ok(list.bases)
    }

    pub async fn save_config(&self, bases: &[String]) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("save_config", &json!({ "bases": bases })).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn prices_periods(&self, year: i32) -> Result<Vec<PriceEntry>, DeskError> {
        let list: PriceList<PriceEntry> = self.get_json(&format!("get_prices_periods/{}", year)).await?;
        Ok(list.prices)
    }

    pub async fn legacy_prices(&self, year: i32) -> Result<Vec<LegacyPrice>, DeskError> {
        let list: PriceList<LegacyPrice> = self.get_json(&format!("get_prices/{}", year)).await?;
        Ok(list.prices)
    }

    /// Prices with periods, or the single yearly price when the periods
    /// endpoint cannot be reached or decoded.
    pub async fn load_prices(&self, year: i32) -> Result<PriceTable, DeskError> {
        match self.prices_periods(year).await {
            Ok(entries) => Ok(PriceTable::Periods(entries)),
            Err(e) if e.is_transport() => {
                tracing::warn!(year, error = %e, "price periods unavailable, using yearly prices");
                Ok(PriceTable::Legacy(self.legacy_prices(year).await?))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn add_price_period(&self, period: &NewPeriod) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("add_price_period", period).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn delete_price_period(&self, key: &PeriodKey) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("delete_price_period", key).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn update_price(&self, update: &PriceUpdate) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("update_price", update).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn duplicate_year(&self, copy: &YearCopy) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("duplicate_year", copy).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn import_prices(&self, file: FileUpload, year: i32) -> Result<String, DeskError> {
        let form = Form::new()
            .part("prices_file", file.part())
            .text("year", year.to_string());
        let ack: Ack = self.post_form("import_prices", form).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn export_prices(&self, year: i32) -> Result<Download, DeskError> {
        let request = self.client.get(self.url(&format!("export_prices/{}", year)));
        Self::download(request, format!("prices_{}.xlsx", year)).await
    }

    pub async fn import_pdf_baremes(
        &self,
        file: FileUpload,
        year: i32,
        clear_existing: bool,
    ) -> Result<PdfImportReport, DeskError> {
        let form = Form::new()
            .part("pdf_file", file.part())
            .text("year", year.to_string())
            .text("clear_existing", clear_existing.to_string());
        self.post_form("import_pdf_baremes", form).await
    }

    pub async fn countries(&self) -> Result<Vec<Country>, DeskError> {
        let list: CountryList = self.get_json("get_countries").await?;
        Ok(list.countries)
    }

    pub async fn search_airports(&self, query: &AirportQuery) -> Result<AirportPage, DeskError> {
        let url = Url::parse_with_params(&self.url("search_airports"), query.pairs())
            .map_err(|e| DeskError::InvalidApiResponse(format!("bad backend URL: {}", e)))?;
        tracing::debug!(%url, "GET backend");
        Self::send(self.client.get(url)).await
    }

    pub async fn airport_stats(&self) -> Result<AirportStats, DeskError> {
        self.get_json("get_airport_stats").await
    }

    pub async fn add_airport(&self, airport: &NewAirport) -> Result<String, DeskError> {
        let ack: Ack = self.post_json("add_airport", airport).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn import_airports(
        &self,
        file: FileUpload,
        clear_existing: bool,
    ) -> Result<String, DeskError> {
        let form = Form::new()
            .part("airports_file", file.part())
            .text("clear_existing", clear_existing.to_string());
        let ack: Ack = self.post_form("import_airports_new", form).await?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn upload_excel(&self, file: FileUpload) -> Result<UploadReceipt, DeskError> {
        let form = Form::new().part("excel_file", file.part());
        self.post_form("upload_excel", form).await
    }

    pub async fn process_file(&self, filename: &str, year: i32) -> Result<ProcessOutcome, DeskError> {
        self.post_json("process_file", &json!({ "filename": filename, "year": year }))
            .await
    }

    pub async fn export_results(&self, stamp: i64) -> Result<Download, DeskError> {
        let request = self.client.post(self.url("export_results"));
        Self::download(request, format!("export_indemnites_{}.xlsx", stamp)).await
    }

    pub async fn export_pdf(&self, year: i32, stamp: i64) -> Result<Download, DeskError> {
        let request = self
            .client
            .post(self.url("export_pdf"))
            .json(&json!({ "year": year }));
        Self::download(request, format!("rapport_indemnites_{}.pdf", stamp)).await
    }
}
