//! Upload → process → export flow of a flight roster.
//!
//! ```text
//! Idle --select file--> FileSelected --uploaded--> Uploaded --processed--> Processed
//!                                                               ^             |
//!                                                               +-- process --+
//! ```
//!
//! Only one request is outstanding at a time. A failed request puts the
//! workflow back in the stage it had before the request started.

use std::fmt;

use crate::error::DeskError;
use crate::models::UploadReceipt;

/// Request the workflow is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Process,
    Export,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Upload => "Upload",
            Operation::Process => "Processing",
            Operation::Export => "Export",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stage {
    #[default]
    Idle,
    /// A file was picked and is being sent to the backend.
    FileSelected { name: String },
    /// The backend stored the roster under `filename`.
    Uploaded { filename: String, flights: usize },
    /// The roster was processed for `year`.
    Processed {
        filename: String,
        flights: usize,
        year: i32,
    },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => write!(f, "idle"),
            Stage::FileSelected { name } => write!(f, "file selected ({})", name),
            Stage::Uploaded { filename, .. } => write!(f, "uploaded ({})", filename),
            Stage::Processed { filename, year, .. } => {
                write!(f, "processed ({} for {})", filename, year)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workflow {
    stage: Stage,
    in_flight: Option<(Operation, Stage)>,
}

impl Workflow {
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight.as_ref().map(|(op, _)| *op)
    }

    /// Name of the roster stored on the backend, once uploaded.
    pub fn filename(&self) -> Option<&str> {
        match self.stage {
            Stage::Uploaded { ref filename, .. } | Stage::Processed { ref filename, .. } => {
                Some(filename.as_str())
            }
            _ => None,
        }
    }

    /// Name shown next to the file picker.
    pub fn display_name(&self) -> Option<&str> {
        match self.stage {
            Stage::FileSelected { ref name } => Some(name.as_str()),
            _ => self.filename(),
        }
    }

    /// Year of the last successful processing.
    pub fn processed_year(&self) -> Option<i32> {
        match self.stage {
            Stage::Processed { year, .. } => Some(year),
            _ => None,
        }
    }

    pub fn can_process(&self) -> bool {
        self.in_flight.is_none() && self.filename().is_some()
    }

    pub fn can_export(&self) -> bool {
        self.in_flight.is_none() && matches!(self.stage, Stage::Processed { .. })
    }

    fn begin(&mut self, op: Operation) -> Result<(), DeskError> {
        if let Some((current, _)) = self.in_flight {
            return Err(DeskError::Busy(current.label()));
        }
        self.in_flight = Some((op, self.stage.clone()));
        Ok(())
    }

    /// A file was picked; the upload request may be issued.
    pub fn begin_upload(&mut self, name: &str) -> Result<(), DeskError> {
        if name.trim().is_empty() {
            return Err(DeskError::Validation("No file selected".into()));
        }
        self.begin(Operation::Upload)?;
        self.stage = Stage::FileSelected {
            name: name.to_string(),
        };
        Ok(())
    }

    pub fn finish_upload(&mut self, receipt: &UploadReceipt) {
        self.in_flight = None;
        self.stage = Stage::Uploaded {
            filename: receipt.filename.clone(),
            flights: receipt.nb_vols,
        };
    }

    /// Returns the roster filename the process request is for.
    pub fn begin_process(&mut self) -> Result<String, DeskError> {
        let filename = self
            .filename()
            .map(str::to_string)
            .ok_or_else(|| DeskError::Validation("No file loaded".into()))?;
        self.begin(Operation::Process)?;
        Ok(filename)
    }

    pub fn finish_process(&mut self, year: i32) {
        let flights = match self.stage {
            Stage::Uploaded { flights, .. } | Stage::Processed { flights, .. } => flights,
            _ => 0,
        };
        let filename = self.filename().unwrap_or_default().to_string();
        self.in_flight = None;
        self.stage = Stage::Processed {
            filename,
            flights,
            year,
        };
    }

    pub fn begin_export(&mut self) -> Result<(), DeskError> {
        if !matches!(self.stage, Stage::Processed { .. }) {
            return Err(DeskError::Validation("No results to export".into()));
        }
        self.begin(Operation::Export)
    }

    pub fn finish_export(&mut self) {
        self.in_flight = None;
    }

    /// The outstanding request failed; restore the stage it started from.
    pub fn fail(&mut self) {
        if let Some((_, previous)) = self.in_flight.take() {
            self.stage = previous;
        }
    }
}
