#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/factorlab/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types and interfaces for the factorlab factor research toolkit.
//!
//! This crate provides the foundational abstractions shared by the evaluation
//! and combination engines: error handling, panel data containers, statistics
//! helpers, the data provider boundary and the observer used for progress
//! reporting.

/// The version of the factorlab-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod observer;
pub mod provider;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{FactorLabError, Result};
pub use observer::{EngineEvent, EngineObserver, NoopObserver, RecordingObserver, TracingObserver};
pub use provider::{DataProvider, DataRequest, Frequency, InMemoryProvider, Universe};
pub use types::{CE_TO_UNIX_EPOCH_DAYS, Date, MarketData, Symbol, TimeSeries};
