//! Core domain for creator metrics.
//!
//! Pure calculations over already-fetched data: engagement statistics and
//! tagging for sent email, impression and revenue estimates for episodes,
//! plus the config, error, formatting and port types they share.

pub mod data_processors;
pub mod engagement;
pub mod error;
pub mod formatting;
pub mod models;
pub mod preferences;
pub mod revenue;
pub mod revenue_model;
pub mod settings;
pub mod telemetry;

pub use error::{MetricsError, Result};
