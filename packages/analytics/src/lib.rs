#![deny(clippy::all)]

pub mod effects;
pub mod error;
pub mod estimator;
pub mod pipeline;
pub mod summary;
pub mod synthetic;
pub mod types;

pub use effects::compute_effects;
pub use error::{AnalysisError, ProviderError};
pub use estimator::CounterfactualEstimator;
pub use pipeline::analyze;
pub use summary::build_summary;
pub use synthetic::{ObservedSeriesProvider, SyntheticProfile, SyntheticSalesProvider};
pub use types::{
    ChartSeries, CounterfactualSeries, EffectSeries, ImpactRequest, ImpactResponse,
    ImpactSummary, ObservedSeries, EPSILON, MIN_PRE_PERIOD_DAYS, SIGNIFICANCE_ALPHA, Z_95,
};
