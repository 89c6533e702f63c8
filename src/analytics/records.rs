//! Per-customer feature records used by the analytics engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the customer/order join, as loaded from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerActivity {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub visits: Option<i64>,
    pub last_active: Option<DateTime<Utc>>,
    pub total_spend: f64,
    pub order_count: i64,
    /// Mean order value; `None` when the customer has no orders.
    pub avg_order_value: Option<f64>,
}

/// A customer joined with aggregated order data and recency.
///
/// Built fresh for every analytics request and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedCustomerRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub visits: i64,
    pub total_spend: f64,
    pub order_count: i64,
    pub avg_order_value: f64,
    /// Whole days since `last_active`; `None` when the customer was never active.
    pub days_inactive: Option<i64>,
}

impl DerivedCustomerRecord {
    /// Derives the feature record for one customer relative to `now`.
    ///
    /// Missing numeric aggregates become 0.
    pub fn derive(activity: &CustomerActivity, now: DateTime<Utc>) -> Self {
        Self {
            id: activity.id,
            name: activity.name.clone(),
            email: activity.email.clone(),
            visits: activity.visits.unwrap_or(0),
            total_spend: activity.total_spend,
            order_count: activity.order_count,
            avg_order_value: activity.avg_order_value.unwrap_or(0.0),
            days_inactive: activity
                .last_active
                .map(|last| (now - last).num_days().max(0)),
        }
    }

    /// True when the customer has been inactive for strictly more than `days`.
    ///
    /// Always false for a customer with no recorded activity.
    pub fn inactive_for_more_than(&self, days: i64) -> bool {
        matches!(self.days_inactive, Some(d) if d > days)
    }

    /// True when the customer was active within the last `days` days.
    ///
    /// Always false for a customer with no recorded activity.
    pub fn active_within(&self, days: i64) -> bool {
        matches!(self.days_inactive, Some(d) if d <= days)
    }
}

/// Derives records for every loaded customer.
pub fn derive_records(
    activity: &[CustomerActivity],
    now: DateTime<Utc>,
) -> Vec<DerivedCustomerRecord> {
    activity
        .iter()
        .map(|a| DerivedCustomerRecord::derive(a, now))
        .collect()
}

/// Business segment assigned to a customer. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "VIP")]
    Vip,
    HighValue,
    #[default]
    Regular,
    AtRisk,
}

impl Segment {
    /// All segments in report order.
    pub const ALL: [Segment; 4] = [
        Segment::Vip,
        Segment::HighValue,
        Segment::Regular,
        Segment::AtRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vip => "VIP",
            Self::HighValue => "HighValue",
            Self::Regular => "Regular",
            Self::AtRisk => "AtRisk",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
