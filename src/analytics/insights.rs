//! General business insights.

use serde::Serialize;

use super::records::DerivedCustomerRecord;

/// Fraction of customers, by spend, that form the most valuable group.
const TOP_SPENDER_FRACTION: f64 = 0.2;

/// Headline metrics and derived recommendations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralInsights {
    pub customer_count: usize,
    pub total_revenue: f64,
    pub average_spend: f64,
    pub max_spend: f64,
    /// Customers active within the last 30 days.
    pub active_customers: usize,
    pub retention_rate: f64,
    pub average_visits: f64,
    pub most_valuable_segment: String,
    pub growth_opportunity: String,
}

/// Builds the general insights. Expects a non-empty record set.
pub fn general_insights(records: &[DerivedCustomerRecord]) -> GeneralInsights {
    let n = records.len().max(1) as f64;
    let total_revenue: f64 = records.iter().map(|r| r.total_spend).sum();
    let max_spend = records
        .iter()
        .map(|r| r.total_spend)
        .fold(0.0_f64, f64::max);
    let active_customers = records.iter().filter(|r| r.active_within(30)).count();
    let average_visits = records.iter().map(|r| r.visits as f64).sum::<f64>() / n;

    GeneralInsights {
        customer_count: records.len(),
        total_revenue,
        average_spend: total_revenue / n,
        max_spend,
        active_customers,
        retention_rate: active_customers as f64 / n,
        average_visits,
        most_valuable_segment: most_valuable_segment(records),
        growth_opportunity: growth_opportunity(records),
    }
}

/// Describes the top 20% of customers by spend.
///
/// Falls back to "Regular customers" when that group is empty, which is the
/// case for fewer than five customers.
pub fn most_valuable_segment(records: &[DerivedCustomerRecord]) -> String {
    let top_count = (records.len() as f64 * TOP_SPENDER_FRACTION) as usize;
    if top_count == 0 {
        return "Regular customers".to_string();
    }

    let mut spends: Vec<f64> = records.iter().map(|r| r.total_spend).collect();
    spends.sort_by(|a, b| b.total_cmp(a));
    let top_mean = spends.iter().take(top_count).sum::<f64>() / top_count as f64;

    format!("Top 20% of customers ({top_count}) with average spend ${top_mean:.2}")
}

/// Picks the most pressing growth lever, in priority order.
pub fn growth_opportunity(records: &[DerivedCustomerRecord]) -> String {
    let inactive = records
        .iter()
        .filter(|r| r.inactive_for_more_than(30))
        .count();
    if inactive > 0 {
        return format!("Re-engage {inactive} customers inactive for more than 30 days");
    }

    let low_spenders = records.iter().filter(|r| r.total_spend < 1000.0).count();
    if low_spenders > 0 {
        return format!("Upsell to {low_spenders} customers spending under $1,000");
    }

    "Focus on acquiring new customers to grow the base".to_string()
}

impl GeneralInsights {
    /// Renders the insights as narrative text.
    pub fn narrative(&self) -> String {
        format!(
            "Business Insights\n\n\
             Customers: {}\n\
             Total revenue: ${:.2}\n\
             Average spend: ${:.2}\n\
             Highest spend: ${:.2}\n\
             Active customers (last 30 days): {} ({:.1}% retention)\n\
             Average visits: {:.1}\n\n\
             Most valuable segment: {}\n\
             Growth opportunity: {}\n",
            self.customer_count,
            self.total_revenue,
            self.average_spend,
            self.max_spend,
            self.active_customers,
            self.retention_rate * 100.0,
            self.average_visits,
            self.most_valuable_segment,
            self.growth_opportunity,
        )
    }
}
