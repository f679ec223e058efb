use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Datelike;
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{error, info, warn};

use crate::airports::{AirportForm, NewAirport};
use crate::backend::FileUpload;
use crate::bases::{add_base, bases_text, parse_bases, validate_base};
use crate::desk::{DeskState, NoticeKind, Tab, READY};
use crate::error::DeskError;
use crate::filter::{FilterForm, RotationFilter};
use crate::models::Download;
use crate::pagination::AirportFilters;
use crate::prices::{
    pdf_import_message, year_choices, DeletePeriodForm, DuplicateForm, NewPeriod, PeriodForm,
    PeriodKey, PriceForm, PriceUpdate, PriceTable, YearCopy,
};
use crate::state::AppState;
use crate::view::{
    AirportRow, LegacyRow, PagerView, PriceRow, RotationRow, SummaryView, WorkflowView,
};

/// Query parameters of the desk page.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "crate::models::empty_string_as_none")]
    pub tab: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct YearForm {
    #[serde(default)]
    pub year: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchForm {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct BaseForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub bases: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct BasesForm {
    #[serde(default)]
    pub bases: String,
}

/// Files and text fields of a multipart form, keyed by field name.
#[derive(Debug, Default)]
struct Upload {
    files: HashMap<String, FileUpload>,
    fields: HashMap<String, String>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> Result<Self, DeskError> {
        let unreadable = |e: axum::extract::multipart::MultipartError| {
            DeskError::Validation(format!("Unreadable upload: {}", e))
        };
        let mut upload = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(unreadable)?;
                    // Browsers send an empty part when no file was picked.
                    if !file_name.is_empty() {
                        upload.files.insert(
                            name,
                            FileUpload {
                                name: file_name,
                                bytes: bytes.to_vec(),
                            },
                        );
                    }
                }
                None => {
                    let text = field.text().await.map_err(unreadable)?;
                    upload.fields.insert(name, text);
                }
            }
        }
        Ok(upload)
    }

    fn take_file(&mut self, field: &str) -> Result<FileUpload, DeskError> {
        self.files
            .remove(field)
            .ok_or_else(|| DeskError::Validation("No file selected".into()))
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    /// Checkbox value; absent means unchecked.
    fn flag(&self, name: &str) -> bool {
        matches!(self.field(name), Some("true" | "on" | "1"))
    }
}

fn render_template(tera: &Tera, template: &str, context: &Context) -> Response {
    match tera.render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Render error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render error").into_response()
        }
    }
}

fn back(tab: Tab) -> Redirect {
    Redirect::to(&tab.path())
}

/// Reports an error that stopped an operation before any request went out.
async fn refuse(state: &AppState, tab: Tab, err: DeskError) -> Redirect {
    state.desk.write().await.report(&err);
    back(tab)
}

/// Applies the outcome of a backend call and returns to `tab`.
async fn settle<T>(
    state: &AppState,
    tab: Tab,
    result: Result<T, DeskError>,
    apply: impl FnOnce(&mut DeskState, T),
) -> Redirect {
    let mut desk = state.desk.write().await;
    match result {
        Ok(value) => apply(&mut desk, value),
        Err(e) => desk.report(&e),
    }
    back(tab)
}

/// Sends a backend document on to the browser.
fn attachment(download: Download) -> Response {
    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.filename.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.body,
    )
        .into_response()
}

/// Re-runs the airport search for the pager's current criteria and page.
/// A result that no longer reaches the current page is fetched again from
/// the last page that exists.
async fn run_airport_search(state: &AppState) {
    for _ in 0..2 {
        let query = state.desk.read().await.airports.query();
        let result = state.backend.search_airports(&query).await;
        let mut desk = state.desk.write().await;
        match result {
            Ok(page) => {
                tracing::debug!(page = desk.airports.page(), total = page.total, "airport page loaded");
                if !desk.airports.apply(page) {
                    return;
                }
            }
            Err(e) => {
                desk.report(&e);
                return;
            }
        }
    }
}

/// Fetches whatever the selected pane shows that is not cached yet.
async fn refresh_pane(state: &AppState, tab: Tab) {
    match state.backend.available_years().await {
        Ok(years) => state.desk.write().await.available_years = years,
        Err(e) => warn!(error = %e, "could not load available years"),
    }

    match tab {
        Tab::Prices => {
            let year = {
                let current = chrono::Local::now().year();
                let mut desk = state.desk.write().await;
                let choices = year_choices(&desk.available_years, current);
                desk.prices.settle_year(&choices, current)
            };
            let result = state.backend.load_prices(year).await;
            let mut desk = state.desk.write().await;
            match result {
                // The operator may have switched years meanwhile.
                Ok(table) if desk.prices.year() == Some(year) => desk.prices.replace(table),
                Ok(_) => {}
                Err(e) => desk.report(&e),
            }
        }
        Tab::Airports => {
            let (searched, has_countries) = {
                let desk = state.desk.read().await;
                (desk.airports.searched(), !desk.countries.is_empty())
            };
            if !searched {
                run_airport_search(state).await;
            }
            if !has_countries {
                match state.backend.countries().await {
                    Ok(countries) => state.desk.write().await.countries = countries,
                    Err(e) => warn!(error = %e, "could not load countries"),
                }
            }
            match state.backend.airport_stats().await {
                Ok(stats) => state.desk.write().await.airport_stats = Some(stats),
                Err(e) => warn!(error = %e, "could not load airport statistics"),
            }
        }
        Tab::Config => {
            if state.desk.read().await.bases.is_none() {
                let result = state.backend.config().await;
                let mut desk = state.desk.write().await;
                match result {
                    Ok(bases) => desk.bases = Some(bases),
                    Err(e) => desk.report(&e),
                }
            }
        }
        Tab::Processing | Tab::Summary | Tab::Rotations => {}
    }
}

fn page_context(desk: &mut DeskState, tab: Tab, current_year: i32) -> Context {
    let mut context = Context::new();
    context.insert("tab", &tab);
    context.insert("status", desk.status());
    context.insert("notices", &desk.take_notices());

    // Processing pane
    let years = year_choices(&desk.available_years, current_year);
    context.insert("years", &years);
    context.insert("processing_year", &desk.processing_year);
    context.insert("workflow", &WorkflowView::from(&desk.workflow));

    // Summary and rotations panes
    let summary = desk
        .results
        .as_ref()
        .map(|r| SummaryView::from(&r.summary));
    context.insert("summary", &summary);
    let rotations: Vec<RotationRow> = desk
        .visible_rotations()
        .into_iter()
        .map(RotationRow::from)
        .collect();
    context.insert("rotations", &rotations);
    context.insert("rotation_total", &desk.rotations().len());
    context.insert("filter", &desk.rotation_filter.to_form());

    // Prices pane
    context.insert("prices_year", &desk.prices.year_or(current_year));
    context.insert("prices_search", desk.prices.search());
    let price_rows: Vec<PriceRow> = desk
        .prices
        .visible_entries()
        .into_iter()
        .map(PriceRow::from)
        .collect();
    let legacy_rows: Vec<LegacyRow> = desk
        .prices
        .visible_legacy()
        .into_iter()
        .map(LegacyRow::from)
        .collect();
    context.insert(
        "prices_legacy",
        &matches!(desk.prices.table(), Some(PriceTable::Legacy(_))),
    );
    context.insert("price_rows", &price_rows);
    context.insert("legacy_rows", &legacy_rows);

    // Airports pane
    let airport_rows: Vec<AirportRow> = desk.airports.rows().iter().map(AirportRow::from).collect();
    context.insert("airport_rows", &airport_rows);
    context.insert("airport_filters", desk.airports.filters());
    context.insert("pager", &PagerView::from(&desk.airports));
    context.insert("countries", &desk.countries);
    context.insert("airport_stats", &desk.airport_stats);

    // Configuration pane
    let bases = desk.bases.as_deref().map(bases_text).unwrap_or_default();
    context.insert("bases_text", &bases);

    context
}

/// `GET /?tab=` renders the desk with the selected pane open.
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let tab = query
        .tab
        .as_deref()
        .and_then(Tab::from_name)
        .unwrap_or_default();
    refresh_pane(&state, tab).await;

    let current_year = chrono::Local::now().year();
    let context = {
        let mut desk = state.desk.write().await;
        page_context(&mut desk, tab, current_year)
    };
    render_template(&state.tera, "index.html", &context)
}

/// Runs a workflow request on its own task, so the desk is settled even
/// when the browser goes away before the reply arrives.
async fn run_workflow_task<F>(state: &AppState, task: F) -> Response
where
    F: Future<Output = Response> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "workflow task aborted");
            let mut desk = state.desk.write().await;
            desk.workflow.fail();
            desk.notify(NoticeKind::Error, "Request aborted");
            desk.set_status(READY);
            back(Tab::Processing).into_response()
        }
    }
}

/// `POST /upload` sends the roster to the backend.
pub async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let file = match Upload::read(multipart)
        .await
        .and_then(|mut form| form.take_file("excel_file"))
    {
        Ok(file) => file,
        Err(e) => return refuse(&state, Tab::Processing, e).await.into_response(),
    };

    {
        let mut desk = state.desk.write().await;
        if let Err(e) = desk.workflow.begin_upload(&file.name) {
            desk.report(&e);
            return back(Tab::Processing).into_response();
        }
        desk.set_status(format!("Uploading {}...", file.name));
    }

    let task_state = state.clone();
    run_workflow_task(&state, async move {
        let result = task_state.backend.upload_excel(file).await;
        let mut desk = task_state.desk.write().await;
        match result {
            Ok(receipt) => {
                info!(filename = %receipt.filename, flights = receipt.nb_vols, "roster uploaded");
                desk.workflow.finish_upload(&receipt);
                desk.success(format!(
                    "File loaded: {} ({} flights)",
                    receipt.filename, receipt.nb_vols
                ));
                desk.set_status(format!("File loaded: {}", receipt.filename));
            }
            Err(e) => {
                desk.workflow.fail();
                desk.report(&e);
            }
        }
        back(Tab::Processing).into_response()
    })
    .await
}

/// `POST /process` computes indemnities for the uploaded roster.
pub async fn process(State(state): State<Arc<AppState>>, Form(form): Form<YearForm>) -> Response {
    let year = match form.year.trim().parse::<i32>() {
        Ok(year) => year,
        Err(_) => {
            let err = DeskError::Validation("Invalid year".into());
            return refuse(&state, Tab::Processing, err).await.into_response();
        }
    };

    let filename = {
        let mut desk = state.desk.write().await;
        match desk.workflow.begin_process() {
            Ok(filename) => {
                desk.set_status(format!("Processing {} for {}...", filename, year));
                filename
            }
            Err(e) => {
                desk.report(&e);
                return back(Tab::Processing).into_response();
            }
        }
    };

    let task_state = state.clone();
    run_workflow_task(&state, async move {
        let result = task_state.backend.process_file(&filename, year).await;
        let mut desk = task_state.desk.write().await;
        match result {
            Ok(outcome) => {
                info!(
                    filename = %filename,
                    year,
                    rotations = outcome.rotations.len(),
                    "roster processed"
                );
                desk.processing_year = year;
                desk.workflow.finish_process(year);
                desk.store_results(outcome);
                desk.success("Processing completed");
                desk.set_status("Processing completed");
                back(Tab::Summary).into_response()
            }
            Err(e) => {
                desk.workflow.fail();
                desk.report(&e);
                back(Tab::Processing).into_response()
            }
        }
    })
    .await
}

#[derive(Debug, Clone, Copy)]
enum ExportFormat {
    Xlsx,
    Pdf,
}

async fn export(state: Arc<AppState>, format: ExportFormat) -> Response {
    let year = {
        let mut desk = state.desk.write().await;
        if let Err(e) = desk.workflow.begin_export() {
            desk.report(&e);
            return back(Tab::Processing).into_response();
        }
        desk.set_status("Exporting...");
        desk.workflow
            .processed_year()
            .unwrap_or(desk.processing_year)
    };

    let task_state = state.clone();
    run_workflow_task(&state, async move {
        let stamp = chrono::Utc::now().timestamp_millis();
        let result = match format {
            ExportFormat::Xlsx => task_state.backend.export_results(stamp).await,
            ExportFormat::Pdf => task_state.backend.export_pdf(year, stamp).await,
        };

        let mut desk = task_state.desk.write().await;
        match result {
            Ok(download) => {
                info!(filename = %download.filename, bytes = download.body.len(), "export ready");
                desk.workflow.finish_export();
                desk.success(format!("Export done: {}", download.filename));
                desk.set_status(READY);
                attachment(download)
            }
            Err(e) => {
                desk.workflow.fail();
                desk.report(&e);
                back(Tab::Processing).into_response()
            }
        }
    })
    .await
}

/// `POST /export/xlsx`
pub async fn export_xlsx(State(state): State<Arc<AppState>>) -> Response {
    export(state, ExportFormat::Xlsx).await
}

/// `POST /export/pdf`
pub async fn export_pdf(State(state): State<Arc<AppState>>) -> Response {
    export(state, ExportFormat::Pdf).await
}

pub async fn filter_rotations(
    State(state): State<Arc<AppState>>,
    Form(form): Form<FilterForm>,
) -> Redirect {
    state
        .desk
        .write()
        .await
        .apply_filter(RotationFilter::from(&form));
    back(Tab::Rotations)
}

pub async fn reset_rotations(State(state): State<Arc<AppState>>) -> Redirect {
    state.desk.write().await.reset_filter();
    back(Tab::Rotations)
}

fn config_not_loaded() -> DeskError {
    DeskError::Validation("Configuration is not loaded yet".into())
}

/// `POST /config/bases` adds one base to the edited list; nothing is saved.
/// The form carries the textarea as typed so unsaved edits are kept.
pub async fn add_config_base(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BaseForm>,
) -> Redirect {
    let mut desk = state.desk.write().await;
    if desk.bases.is_none() {
        desk.report(&config_not_loaded());
        return back(Tab::Config);
    }
    let mut bases = parse_bases(&form.bases);
    match add_base(&mut bases, &form.code) {
        Ok(code) => desk.success(format!("Base {} added", code)),
        Err(e) => desk.report(&e),
    }
    desk.bases = Some(bases);
    back(Tab::Config)
}

pub async fn save_config(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BasesForm>,
) -> Redirect {
    if state.desk.read().await.bases.is_none() {
        return refuse(&state, Tab::Config, config_not_loaded()).await;
    }
    let bases = parse_bases(&form.bases);
    if let Some(err) = bases.iter().find_map(|b| validate_base(b).err()) {
        return refuse(&state, Tab::Config, err).await;
    }

    let result = state.backend.save_config(&bases).await;
    settle(&state, Tab::Config, result, |desk, _| {
        desk.bases = Some(bases);
        desk.success("Configuration saved");
    })
    .await
}

pub async fn select_price_year(
    State(state): State<Arc<AppState>>,
    Form(form): Form<YearForm>,
) -> Redirect {
    match form.year.trim().parse::<i32>() {
        Ok(year) => state.desk.write().await.prices.select_year(year),
        Err(_) => {
            let err = DeskError::Validation("Invalid year".into());
            return refuse(&state, Tab::Prices, err).await;
        }
    }
    back(Tab::Prices)
}

pub async fn search_prices(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SearchForm>,
) -> Redirect {
    state.desk.write().await.prices.set_search(&form.search);
    back(Tab::Prices)
}

async fn price_year(state: &AppState) -> i32 {
    let desk = state.desk.read().await;
    desk.prices.year_or(desk.processing_year)
}

pub async fn add_price_period(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PeriodForm>,
) -> Redirect {
    let period = match NewPeriod::parse(&form, price_year(&state).await) {
        Ok(period) => period,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let result = state.backend.add_price_period(&period).await;
    settle(&state, Tab::Prices, result, |desk, _| {
        desk.success(format!("Price period added for {}", period.icao_prefix));
    })
    .await
}

pub async fn delete_price_period(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DeletePeriodForm>,
) -> Redirect {
    let key = match PeriodKey::parse(&form, price_year(&state).await) {
        Ok(key) => key,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let result = state.backend.delete_price_period(&key).await;
    settle(&state, Tab::Prices, result, |desk, _| {
        desk.success("Price deleted");
    })
    .await
}

pub async fn update_price(
    State(state): State<Arc<AppState>>,
    Form(form): Form<PriceForm>,
) -> Redirect {
    let update = match PriceUpdate::parse(&form, price_year(&state).await) {
        Ok(update) => update,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let result = state.backend.update_price(&update).await;
    settle(&state, Tab::Prices, result, |desk, _| {
        desk.success("Price updated");
    })
    .await
}

pub async fn duplicate_prices(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DuplicateForm>,
) -> Redirect {
    let copy = match YearCopy::parse(&form, price_year(&state).await) {
        Ok(copy) => copy,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let result = state.backend.duplicate_year(&copy).await;
    settle(&state, Tab::Prices, result, |desk, message| {
        if message.is_empty() {
            desk.success(format!(
                "Prices copied from {} to {}",
                copy.source_year, copy.target_year
            ));
        } else {
            desk.success(message);
        }
    })
    .await
}

pub async fn import_prices(State(state): State<Arc<AppState>>, multipart: Multipart) -> Redirect {
    let file = match Upload::read(multipart)
        .await
        .and_then(|mut form| form.take_file("prices_file"))
    {
        Ok(file) => file,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let year = price_year(&state).await;
    state.desk.write().await.set_status("Importing prices...");

    let result = state.backend.import_prices(file, year).await;
    settle(&state, Tab::Prices, result, |desk, message| {
        desk.success(if message.is_empty() {
            "Prices imported".to_string()
        } else {
            message
        });
        desk.set_status(READY);
    })
    .await
}

pub async fn import_pdf_prices(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Redirect {
    let mut form = match Upload::read(multipart).await {
        Ok(form) => form,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let file = match form.take_file("pdf_file") {
        Ok(file) => file,
        Err(e) => return refuse(&state, Tab::Prices, e).await,
    };
    let year = match form.field("year").map(str::parse::<i32>) {
        Some(Ok(year)) => year,
        Some(Err(_)) => {
            let err = DeskError::Validation("Invalid year".into());
            return refuse(&state, Tab::Prices, err).await;
        }
        None => price_year(&state).await,
    };
    let clear_existing = form.flag("clear_existing");
    state.desk.write().await.set_status("Importing PDF scales...");

    let result = state
        .backend
        .import_pdf_baremes(file, year, clear_existing)
        .await;
    settle(&state, Tab::Prices, result, |desk, report| {
        desk.success(pdf_import_message(&report, year));
        desk.set_status(READY);
    })
    .await
}

/// `GET /prices/export` downloads the active year's price table.
pub async fn export_prices(State(state): State<Arc<AppState>>) -> Response {
    let year = price_year(&state).await;
    match state.backend.export_prices(year).await {
        Ok(download) => attachment(download),
        Err(e) => refuse(&state, Tab::Prices, e).await.into_response(),
    }
}

pub async fn search_airports(
    State(state): State<Arc<AppState>>,
    Form(filters): Form<AirportFilters>,
) -> Redirect {
    state.desk.write().await.airports.set_filters(filters);
    run_airport_search(&state).await;
    back(Tab::Airports)
}

pub async fn reset_airports(State(state): State<Arc<AppState>>) -> Redirect {
    state.desk.write().await.airports.reset_filters();
    run_airport_search(&state).await;
    back(Tab::Airports)
}

pub async fn next_airports(State(state): State<Arc<AppState>>) -> Redirect {
    let moved = state.desk.write().await.airports.next();
    if moved {
        run_airport_search(&state).await;
    }
    back(Tab::Airports)
}

pub async fn prev_airports(State(state): State<Arc<AppState>>) -> Redirect {
    let moved = state.desk.write().await.airports.prev();
    if moved {
        run_airport_search(&state).await;
    }
    back(Tab::Airports)
}

/// `POST /airports` creates one airport, then refreshes the search.
pub async fn add_airport(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AirportForm>,
) -> Redirect {
    let airport = match NewAirport::try_from(form) {
        Ok(airport) => airport,
        Err(e) => return refuse(&state, Tab::Airports, e).await,
    };

    let result = state.backend.add_airport(&airport).await;
    let added = result.is_ok();
    let redirect = settle(&state, Tab::Airports, result, |desk, message| {
        desk.success(if message.is_empty() {
            format!("Airport {} added", airport.icao_code)
        } else {
            message
        });
    })
    .await;
    if added {
        run_airport_search(&state).await;
    }
    redirect
}

pub async fn import_airports(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Redirect {
    let mut form = match Upload::read(multipart).await {
        Ok(form) => form,
        Err(e) => return refuse(&state, Tab::Airports, e).await,
    };
    let file = match form.take_file("airports_file") {
        Ok(file) => file,
        Err(e) => return refuse(&state, Tab::Airports, e).await,
    };
    let clear_existing = form.flag("clear_existing");
    state.desk.write().await.set_status("Importing airports...");

    let result = state.backend.import_airports(file, clear_existing).await;
    let imported = result.is_ok();
    let redirect = settle(&state, Tab::Airports, result, |desk, message| {
        desk.success(if message.is_empty() {
            "Airports imported".to_string()
        } else {
            message
        });
        desk.set_status(READY);
    })
    .await;
    if imported {
        run_airport_search(&state).await;
    }
    redirect
}
