//! Customer segmentation.
//!
//! Masks are applied in a fixed order and later matches overwrite earlier
//! ones: AtRisk, then HighValue, then VIP. A customer that matches both the
//! AtRisk and VIP predicates therefore ends up VIP.

use serde::Serialize;

use super::records::{DerivedCustomerRecord, Segment};

/// Assigns the segment for one customer.
pub fn assign_segment(record: &DerivedCustomerRecord) -> Segment {
    let mut segment = Segment::Regular;
    if record.inactive_for_more_than(30) || record.total_spend < 500.0 {
        segment = Segment::AtRisk;
    }
    if record.total_spend > 2000.0 && record.active_within(15) {
        segment = Segment::HighValue;
    }
    if record.total_spend > 5000.0 && record.active_within(7) {
        segment = Segment::Vip;
    }
    segment
}

/// Assigns a segment to every customer, in input order.
pub fn segment_customers(records: &[DerivedCustomerRecord]) -> Vec<Segment> {
    records.iter().map(assign_segment).collect()
}

/// Per-segment totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub revenue: f64,
    /// Percentage of total revenue held by this segment.
    pub revenue_share: f64,
}

/// Segmentation report covering all four segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationReport {
    pub customer_count: usize,
    pub total_revenue: f64,
    pub segments: Vec<SegmentSummary>,
}

/// Builds the segmentation report.
pub fn customer_segmentation(records: &[DerivedCustomerRecord]) -> SegmentationReport {
    let assignments = segment_customers(records);
    let total_revenue: f64 = records.iter().map(|r| r.total_spend).sum();

    let segments = Segment::ALL
        .iter()
        .map(|&segment| {
            let (customers, revenue) = records
                .iter()
                .zip(&assignments)
                .filter(|(_, assigned)| **assigned == segment)
                .fold((0usize, 0.0_f64), |(count, sum), (record, _)| {
                    (count + 1, sum + record.total_spend)
                });
            let revenue_share = if total_revenue == 0.0 {
                0.0
            } else {
                revenue / total_revenue * 100.0
            };
            SegmentSummary {
                segment,
                customers,
                revenue,
                revenue_share,
            }
        })
        .collect();

    SegmentationReport {
        customer_count: records.len(),
        total_revenue,
        segments,
    }
}

impl SegmentationReport {
    /// Returns the summary for one segment.
    pub fn segment(&self, segment: Segment) -> Option<&SegmentSummary> {
        self.segments.iter().find(|s| s.segment == segment)
    }

    /// Renders the report as narrative text.
    pub fn narrative(&self) -> String {
        let mut out = format!(
            "Customer Segmentation\n\nCustomers analyzed: {}\nTotal revenue: ${:.2}\n\n",
            self.customer_count, self.total_revenue
        );
        for summary in &self.segments {
            out.push_str(&format!(
                "{}: {} customers, ${:.2} revenue ({:.1}% of total)\n",
                summary.segment, summary.customers, summary.revenue, summary.revenue_share
            ));
        }
        out
    }
}
