//! Predictive analytics over customer and order data.
//!
//! The engine works on [`DerivedCustomerRecord`]s built from one join query
//! per request. The report mode is picked once from the question text and
//! handled by an exhaustive match.

pub mod churn;
pub mod insights;
pub mod records;
pub mod revenue;
pub mod segmentation;

pub use churn::{analyze_churn_risk, ChurnBucket, ChurnReport, CustomerSummary};
pub use insights::{general_insights, GeneralInsights};
pub use records::{derive_records, CustomerActivity, DerivedCustomerRecord, Segment};
pub use revenue::{predict_revenue, RevenueReport, SpendModel, MIN_RECORDS_FOR_FORECAST};
pub use segmentation::{
    assign_segment, customer_segmentation, segment_customers, SegmentationReport,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Report mode requested by a predictive question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsMode {
    Churn,
    Revenue,
    Segmentation,
    General,
}

impl AnalyticsMode {
    /// Selects the mode by keyword; the first match wins.
    pub fn detect(query: &str) -> Self {
        let query = query.to_lowercase();
        if query.contains("churn") {
            Self::Churn
        } else if query.contains("revenue") || query.contains("forecast") {
            Self::Revenue
        } else if query.contains("segmentation") {
            Self::Segmentation
        } else {
            Self::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Churn => "churn",
            Self::Revenue => "revenue",
            Self::Segmentation => "segmentation",
            Self::General => "general",
        }
    }
}

/// The result of one analytics run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum AnalyticsReport {
    Churn(ChurnReport),
    Revenue(RevenueReport),
    Segmentation(SegmentationReport),
    General(GeneralInsights),
    /// No customers were loaded.
    NoData { message: String },
    /// Too few customers for the revenue model.
    InsufficientData {
        required: usize,
        available: usize,
        message: String,
    },
}

impl AnalyticsReport {
    /// Renders the report as narrative text.
    pub fn narrative(&self) -> String {
        match self {
            Self::Churn(report) => report.narrative(),
            Self::Revenue(report) => report.narrative(),
            Self::Segmentation(report) => report.narrative(),
            Self::General(report) => report.narrative(),
            Self::NoData { message, .. } | Self::InsufficientData { message, .. } => {
                message.clone()
            }
        }
    }
}

/// Report plus its narrative rendering, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsOutcome {
    pub mode: AnalyticsMode,
    pub summary: String,
    #[serde(flatten)]
    pub report: AnalyticsReport,
}

/// Runs the report for `mode` over the given records.
pub fn analyze(mode: AnalyticsMode, records: &[DerivedCustomerRecord]) -> AnalyticsReport {
    if records.is_empty() {
        return AnalyticsReport::NoData {
            message: "No customer data available for analysis.".to_string(),
        };
    }

    match mode {
        AnalyticsMode::Churn => AnalyticsReport::Churn(analyze_churn_risk(records)),
        AnalyticsMode::Revenue => match predict_revenue(records) {
            Some(report) => AnalyticsReport::Revenue(report),
            None => AnalyticsReport::InsufficientData {
                required: MIN_RECORDS_FOR_FORECAST,
                available: records.len(),
                message: format!(
                    "Insufficient data for revenue prediction: need at least {} customers, found {}.",
                    MIN_RECORDS_FOR_FORECAST,
                    records.len()
                ),
            },
        },
        AnalyticsMode::Segmentation => {
            AnalyticsReport::Segmentation(customer_segmentation(records))
        }
        AnalyticsMode::General => AnalyticsReport::General(general_insights(records)),
    }
}

/// Stateless analytics entry point bound to a reference time.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsEngine {
    now: DateTime<Utc>,
}

impl AnalyticsEngine {
    /// Creates an engine measuring recency against `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Creates an engine measuring recency against the current time.
    pub fn at_current_time() -> Self {
        Self::new(Utc::now())
    }

    /// Answers a predictive question over the loaded customer activity.
    pub fn run(&self, query: &str, activity: &[CustomerActivity]) -> AnalyticsOutcome {
        let mode = AnalyticsMode::detect(query);
        let records = derive_records(activity, self.now);
        debug!(
            "Running {} analytics over {} customers",
            mode.as_str(),
            records.len()
        );

        let report = analyze(mode, &records);
        AnalyticsOutcome {
            mode,
            summary: report.narrative(),
            report,
        }
    }
}
