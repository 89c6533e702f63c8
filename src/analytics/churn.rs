//! Churn-risk report.
//!
//! Buckets are evaluated independently, so one customer can appear in more
//! than one of them.

use serde::Serialize;

use super::records::DerivedCustomerRecord;

/// Number of customers listed per bucket.
pub const BUCKET_SAMPLE_SIZE: usize = 5;

const RECOMMENDATIONS: [&str; 3] = [
    "Send personalized win-back offers to high-risk customers",
    "Run re-engagement campaigns for medium-risk customers",
    "Enroll low-risk customers in loyalty rewards to keep them active",
];

/// Short customer reference used in report listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub total_spend: f64,
    pub days_inactive: Option<i64>,
}

impl From<&DerivedCustomerRecord> for CustomerSummary {
    fn from(record: &DerivedCustomerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            total_spend: record.total_spend,
            days_inactive: record.days_inactive,
        }
    }
}

/// Members of one risk bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnBucket {
    /// Total number of matching customers.
    pub count: usize,
    /// The first matching customers, in input order.
    pub customers: Vec<CustomerSummary>,
}

impl ChurnBucket {
    fn collect<'a>(
        records: &'a [DerivedCustomerRecord],
        predicate: impl Fn(&DerivedCustomerRecord) -> bool,
    ) -> Self {
        let members: Vec<&'a DerivedCustomerRecord> =
            records.iter().filter(|r| predicate(r)).collect();
        Self {
            count: members.len(),
            customers: members
                .into_iter()
                .take(BUCKET_SAMPLE_SIZE)
                .map(CustomerSummary::from)
                .collect(),
        }
    }
}

/// Churn-risk report over all customers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChurnReport {
    pub customer_count: usize,
    pub high_risk: ChurnBucket,
    pub medium_risk: ChurnBucket,
    pub low_risk: ChurnBucket,
    pub recommendations: Vec<String>,
}

/// Inactive for over a month with modest spend.
pub fn is_high_risk(record: &DerivedCustomerRecord) -> bool {
    record.inactive_for_more_than(30) && record.total_spend < 1000.0
}

/// Either drifting away or spending little.
pub fn is_medium_risk(record: &DerivedCustomerRecord) -> bool {
    record.inactive_for_more_than(15) || record.total_spend < 500.0
}

/// Recently active big spenders.
pub fn is_low_risk(record: &DerivedCustomerRecord) -> bool {
    record.active_within(7) && record.total_spend > 2000.0
}

/// Builds the churn-risk report.
pub fn analyze_churn_risk(records: &[DerivedCustomerRecord]) -> ChurnReport {
    ChurnReport {
        customer_count: records.len(),
        high_risk: ChurnBucket::collect(records, is_high_risk),
        medium_risk: ChurnBucket::collect(records, is_medium_risk),
        low_risk: ChurnBucket::collect(records, is_low_risk),
        recommendations: RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    }
}

impl ChurnReport {
    /// Renders the report as narrative text.
    pub fn narrative(&self) -> String {
        let mut out = String::from("Customer Churn Risk Analysis\n\n");
        for (label, bucket) in [
            ("High risk (inactive 30+ days, spend under $1,000)", &self.high_risk),
            ("Medium risk (inactive 15+ days or spend under $500)", &self.medium_risk),
            ("Low risk (active within 7 days, spend over $2,000)", &self.low_risk),
        ] {
            out.push_str(&format!("{label}: {} customers\n", bucket.count));
            for customer in &bucket.customers {
                let inactivity = customer
                    .days_inactive
                    .map(|d| format!("{d} days inactive"))
                    .unwrap_or_else(|| "never active".to_string());
                out.push_str(&format!(
                    "  - {} <{}>: ${:.2} spent, {}\n",
                    customer.name, customer.email, customer.total_spend, inactivity
                ));
            }
        }
        out.push_str("\nRecommendations:\n");
        for recommendation in &self.recommendations {
            out.push_str(&format!("  - {recommendation}\n"));
        }
        out
    }
}
