//! Operator desk for the crew per-diem backend.
//!
//! The desk renders one page with six panes (processing, summary,
//! rotations, prices, airports, configuration). Every form posts to a
//! handler that updates [`desk::DeskState`], calls the backend through
//! [`backend::BackendClient`] when needed, and redirects back to the pane.

pub mod airports;
pub mod backend;
pub mod bases;
pub mod desk;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod prices;
pub mod router;
pub mod state;
pub mod view;
pub mod workflow;
