//! Progress and result reporting for the engines.
//!
//! The engines are side-effect free: instead of logging they hand structured
//! [`EngineEvent`]s to an injected [`EngineObserver`]. Callers pick what to do
//! with them, from nothing ([`NoopObserver`]) to `tracing` output
//! ([`TracingObserver`]).

use std::collections::BTreeMap;
use std::sync::Mutex;

/// A structured event emitted by an engine run.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent<'a> {
    /// A single-factor run started.
    RunStarted {
        /// Factor under test.
        factor: &'a str,
    },
    /// Factor values and forward returns were inner-joined.
    PanelAligned {
        /// Factor under test.
        factor: &'a str,
        /// Number of `(date, instrument)` rows retained.
        rows: usize,
        /// Number of distinct dates retained.
        dates: usize,
    },
    /// Cross-sectional preprocessing finished.
    Preprocessed {
        /// Factor under test.
        factor: &'a str,
        /// Number of dates processed.
        dates: usize,
        /// Whether winsorization ran.
        winsorized: bool,
        /// Whether z-scoring ran.
        standardized: bool,
    },
    /// Neutralization was requested but no exposure model is available.
    NeutralizationSkipped {
        /// Factor under test.
        factor: &'a str,
    },
    /// An IC series and its summary were computed.
    IcComputed {
        /// Factor under test.
        factor: &'a str,
        /// Correlation method name.
        method: &'a str,
        /// Mean IC.
        mean: f64,
        /// IC standard deviation.
        std: f64,
        /// Mean IC over its standard deviation.
        icir: f64,
        /// Fraction of dates with positive IC.
        positive_rate: f64,
    },
    /// Quantile buckets were formed for every date.
    GroupsComputed {
        /// Factor under test.
        factor: &'a str,
        /// Number of dates bucketed.
        dates: usize,
        /// Dates on which duplicate edges left fewer buckets than requested.
        collapsed_dates: usize,
    },
    /// Long-short performance was summarised.
    PerformanceComputed {
        /// Factor under test.
        factor: &'a str,
        /// Annualized long-short return.
        annual_return: f64,
        /// Long-short Sharpe ratio.
        sharpe_ratio: f64,
        /// Long-short maximum drawdown.
        max_drawdown: f64,
    },
    /// A composite factor was built from weighted inputs.
    CompositeBuilt {
        /// Number of input factors carrying weight.
        factors: usize,
        /// Number of `(date, instrument)` rows in the composite.
        rows: usize,
    },
    /// Factor weights were derived by an optimizer heuristic.
    WeightsOptimized {
        /// Optimizer method name.
        method: &'a str,
        /// Resulting normalized weights.
        weights: &'a BTreeMap<String, f64>,
    },
    /// Something degraded but the run continued.
    Warning {
        /// Human-readable description.
        message: &'a str,
    },
    /// A single-factor run finished.
    RunFinished {
        /// Factor under test.
        factor: &'a str,
    },
}

impl EngineEvent<'_> {
    /// Short stable name of the event kind.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::PanelAligned { .. } => "panel_aligned",
            Self::Preprocessed { .. } => "preprocessed",
            Self::NeutralizationSkipped { .. } => "neutralization_skipped",
            Self::IcComputed { .. } => "ic_computed",
            Self::GroupsComputed { .. } => "groups_computed",
            Self::PerformanceComputed { .. } => "performance_computed",
            Self::CompositeBuilt { .. } => "composite_built",
            Self::WeightsOptimized { .. } => "weights_optimized",
            Self::Warning { .. } => "warning",
            Self::RunFinished { .. } => "run_finished",
        }
    }
}

/// Receives engine events.
///
/// Implementations must be thread-safe so a single observer can be shared
/// across factors evaluated in parallel.
pub trait EngineObserver: Send + Sync {
    /// Called once per event, synchronously, in emission order.
    fn on_event(&self, event: &EngineEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn on_event(&self, _event: &EngineEvent<'_>) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&self, event: &EngineEvent<'_>) {
        match *event {
            EngineEvent::RunStarted { factor } => {
                tracing::info!(factor, "starting factor backtest");
            }
            EngineEvent::PanelAligned {
                factor,
                rows,
                dates,
            } => {
                tracing::info!(factor, rows, dates, "aligned factor and forward returns");
            }
            EngineEvent::Preprocessed {
                factor,
                dates,
                winsorized,
                standardized,
            } => {
                tracing::info!(factor, dates, winsorized, standardized, "preprocessed factor");
            }
            EngineEvent::NeutralizationSkipped { factor } => {
                tracing::warn!(factor, "neutralization requested but no exposure model is available");
            }
            EngineEvent::IcComputed {
                factor,
                method,
                mean,
                std,
                icir,
                positive_rate,
            } => {
                tracing::info!(factor, method, mean, std, icir, positive_rate, "computed IC");
            }
            EngineEvent::GroupsComputed {
                factor,
                dates,
                collapsed_dates,
            } => {
                tracing::info!(factor, dates, collapsed_dates, "computed quantile groups");
            }
            EngineEvent::PerformanceComputed {
                factor,
                annual_return,
                sharpe_ratio,
                max_drawdown,
            } => {
                tracing::info!(
                    factor,
                    annual_return,
                    sharpe_ratio,
                    max_drawdown,
                    "computed long-short performance"
                );
            }
            EngineEvent::CompositeBuilt { factors, rows } => {
                tracing::info!(factors, rows, "built composite factor");
            }
            EngineEvent::WeightsOptimized { method, weights } => {
                tracing::info!(method, ?weights, "optimized factor weights");
            }
            EngineEvent::Warning { message } => {
                tracing::warn!("{message}");
            }
            EngineEvent::RunFinished { factor } => {
                tracing::info!(factor, "factor backtest completed");
            }
        }
    }
}

/// Keeps a log of event labels, mostly useful in tests.
///
/// Warnings are recorded as `warning: <message>`.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events, in order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Whether an event with this label was recorded.
    pub fn saw(&self, label: &str) -> bool {
        self.events()
            .iter()
            .any(|e| e == label || e.starts_with(&format!("{label}:")))
    }
}

impl EngineObserver for RecordingObserver {
    fn on_event(&self, event: &EngineEvent<'_>) {
        let entry = match event {
            EngineEvent::Warning { message } => format!("warning: {message}"),
            other => other.label().to_string(),
        };
        if let Ok(mut events) = self.events.lock() {
            events.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.on_event(&EngineEvent::RunStarted { factor: "momentum" });
        observer.on_event(&EngineEvent::Warning {
            message: "no overlap",
        });

        assert_eq!(observer.events(), vec!["run_started", "warning: no overlap"]);
        assert!(observer.saw("warning"));
        assert!(!observer.saw("run_finished"));
    }

    #[test]
    fn test_noop_and_tracing_accept_events() {
        let weights = BTreeMap::from([("a".to_string(), 1.0)]);
        let event = EngineEvent::WeightsOptimized {
            method: "ic",
            weights: &weights,
        };
        NoopObserver.on_event(&event);
        TracingObserver.on_event(&event);
        assert_eq!(event.label(), "weights_optimized");
    }

    #[test]
    fn test_observer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn EngineObserver>();
    }
}
