//! Operator-facing state of the desk and the updates applied to it.
//!
//! `DeskState` is the single value every handler reads and updates. Handlers
//! take the lock, apply one of the update methods below, and release the lock
//! before talking to the backend; rendering only ever reads it.

use chrono::Datelike;
use serde::Serialize;

use crate::error::DeskError;
use crate::filter::RotationFilter;
use crate::models::{AirportStats, Country, ProcessOutcome, Rotation, Summary};
use crate::pagination::AirportPager;
use crate::prices::PricesView;
use crate::workflow::Workflow;

/// Status line shown when nothing is going on.
pub const READY: &str = "Ready";

/// Pane selected with `/?tab=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Processing,
    Summary,
    Rotations,
    Prices,
    Airports,
    Config,
}

impl Tab {
    pub fn as_str(self) -> &'static str {
        match self {
            Tab::Processing => "processing",
            Tab::Summary => "summary",
            Tab::Rotations => "rotations",
            Tab::Prices => "prices",
            Tab::Airports => "airports",
            Tab::Config => "config",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "processing" => Some(Tab::Processing),
            "summary" => Some(Tab::Summary),
            "rotations" => Some(Tab::Rotations),
            "prices" => Some(Tab::Prices),
            "airports" => Some(Tab::Airports),
            "config" => Some(Tab::Config),
            _ => None,
        }
    }

    pub fn path(self) -> String {
        format!("/?tab={}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// Transient message shown once on the next render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NoticeKind,
    pub message: String,
}

/// Result of the last successful processing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Results {
    pub summary: Summary,
    pub rotations: Vec<Rotation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeskState {
    /// Year the roster is processed for.
    pub processing_year: i32,
    /// Years the backend holds price tables for, as last fetched.
    pub available_years: Vec<i32>,
    pub workflow: Workflow,
    pub results: Option<Results>,
    pub rotation_filter: RotationFilter,
    /// Bases as last loaded or edited; `None` until loaded.
    pub bases: Option<Vec<String>>,
    pub prices: PricesView,
    pub airports: AirportPager,
    pub countries: Vec<Country>,
    pub airport_stats: Option<AirportStats>,
    notices: Vec<Notification>,
    status: String,
}

impl Default for DeskState {
    fn default() -> Self {
        Self::new(chrono::Local::now().year())
    }
}

impl DeskState {
    pub fn new(current_year: i32) -> Self {
        Self {
            processing_year: current_year,
            available_years: Vec::new(),
            workflow: Workflow::default(),
            results: None,
            rotation_filter: RotationFilter::default(),
            bases: None,
            prices: PricesView::default(),
            airports: AirportPager::default(),
            countries: Vec::new(),
            airport_stats: None,
            notices: Vec::new(),
            status: READY.to_string(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notification {
            kind,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.notify(NoticeKind::Success, message);
    }

    /// Shows an error to the operator and puts the status line back to ready.
    pub fn report(&mut self, err: &DeskError) {
        let (kind, message) = err.notice();
        match kind {
            NoticeKind::Error => tracing::warn!(error = %err, "desk operation failed"),
            _ => tracing::debug!(error = %err, "desk operation refused"),
        }
        self.notify(kind, message);
        self.status = READY.to_string();
    }

    /// Notifications not shown yet; each one is handed out once.
    pub fn take_notices(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notices)
    }

    /// Stores a fresh processing result; any filter from the previous
    /// roster is dropped.
    pub fn store_results(&mut self, outcome: ProcessOutcome) {
        self.results = Some(Results {
            summary: outcome.summary,
            rotations: outcome.rotations,
        });
        self.rotation_filter = RotationFilter::default();
    }

    pub fn rotations(&self) -> &[Rotation] {
        self.results
            .as_ref()
            .map(|r| r.rotations.as_slice())
            .unwrap_or(&[])
    }

    /// Rotations passing the current filter, in roster order.
    pub fn visible_rotations(&self) -> Vec<&Rotation> {
        self.rotation_filter.apply(self.rotations())
    }

    /// Installs a new filter and reports how many rotations it keeps.
    pub fn apply_filter(&mut self, filter: RotationFilter) -> usize {
        self.rotation_filter = filter;
        let found = self.visible_rotations().len();
        self.success(format!("{} rotation(s) found", found));
        found
    }

    pub fn reset_filter(&mut self) {
        self.rotation_filter = RotationFilter::default();
        self.success("Filters reset");
    }
}
