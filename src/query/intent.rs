//! Intent classification for natural-language questions.

use serde::Serialize;

const PREDICTIVE_KEYWORDS: [&str; 10] = [
    "predict",
    "forecast",
    "churn",
    "risk",
    "segmentation",
    "insights",
    "analysis",
    "trends",
    "opportunity",
    "recommendation",
];

const EXPORT_KEYWORDS: [&str; 1] = ["export"];

// "kitne log" is colloquial Hindi for "how many people".
const COUNT_KEYWORDS: [&str; 5] = ["how many", "count", "number of", "total users", "kitne log"];

/// The coarse category a question is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Answered by the analytics engine.
    Predictive,
    /// Rows returned as a spreadsheet download.
    Export,
    /// A single number.
    Count,
    /// Rows returned inline, plus a spreadsheet path.
    Tabular,
}

impl Intent {
    /// Classifies a question by keyword.
    ///
    /// Priority is predictive, then export, then count; anything else is
    /// tabular.
    pub fn classify(query: &str) -> Self {
        let query = query.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

        if mentions(&PREDICTIVE_KEYWORDS) {
            Self::Predictive
        } else if mentions(&EXPORT_KEYWORDS) {
            Self::Export
        } else if mentions(&COUNT_KEYWORDS) {
            Self::Count
        } else {
            Self::Tabular
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predictive => "predictive",
            Self::Export => "export",
            Self::Count => "count",
            Self::Tabular => "tabular",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
