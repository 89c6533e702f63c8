//! Analytics engine integration tests.
//!
//! Runs the engine end to end over fixed customer activity.

use chrono::{DateTime, Duration, TimeZone, Utc};
use crm_insight::analytics::{
    AnalyticsEngine, AnalyticsMode, AnalyticsReport, CustomerActivity, Segment,
};
use pretty_assertions::assert_eq;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

fn customer(id: i64, spend: f64, days_inactive: i64, visits: i64, orders: i64) -> CustomerActivity {
    CustomerActivity {
        id,
        name: format!("Customer {id}"),
        email: format!("customer{id}@example.com"),
        visits: Some(visits),
        last_active: Some(now() - Duration::days(days_inactive)),
        total_spend: spend,
        order_count: orders,
        avg_order_value: (orders > 0).then(|| spend / orders as f64),
    }
}

/// Ten customers spanning every segment.
fn ten_customers() -> Vec<CustomerActivity> {
    vec![
        customer(1, 6000.0, 2, 12, 10),
        customer(2, 5200.0, 5, 9, 8),
        customer(3, 2500.0, 10, 7, 5),
        customer(4, 2100.0, 14, 6, 4),
        customer(5, 1500.0, 20, 4, 3),
        customer(6, 800.0, 25, 3, 2),
        customer(7, 450.0, 40, 2, 1),
        customer(8, 300.0, 60, 1, 1),
        customer(9, 0.0, 90, 1, 0),
        customer(10, 1200.0, 3, 5, 2),
    ]
}

#[test]
fn test_general_insights_total_revenue_is_exact_sum() {
    let customers = ten_customers();
    let expected: f64 = customers.iter().map(|c| c.total_spend).sum();

    let outcome = AnalyticsEngine::new(now()).run("Give me insights on our customers", &customers);

    assert_eq!(outcome.mode, AnalyticsMode::General);
    let AnalyticsReport::General(insights) = &outcome.report else {
        panic!("expected general insights, got {:?}", outcome.report);
    };
    assert_eq!(insights.customer_count, 10);
    assert_eq!(insights.total_revenue, expected);
    assert_eq!(insights.max_spend, 6000.0);
}

#[test]
fn test_segmentation_shares_cover_all_revenue() {
    let outcome = AnalyticsEngine::new(now()).run("Customer segmentation", &ten_customers());

    let AnalyticsReport::Segmentation(report) = &outcome.report else {
        panic!("expected segmentation, got {:?}", outcome.report);
    };
    let customers: usize = report.segments.iter().map(|s| s.customers).sum();
    let share: f64 = report.segments.iter().map(|s| s.revenue_share).sum();

    assert_eq!(customers, 10);
    assert!((share - 100.0).abs() < 1e-6, "shares sum to {share}");
    assert_eq!(report.segment(Segment::Vip).unwrap().customers, 2);
    assert_eq!(report.segment(Segment::HighValue).unwrap().customers, 2);
}

#[test]
fn test_churn_buckets_overlap() {
    let customers = vec![customer(1, 400.0, 40, 1, 1), customer(2, 3000.0, 1, 8, 6)];

    let outcome = AnalyticsEngine::new(now()).run("Who is likely to churn?", &customers);

    let AnalyticsReport::Churn(report) = &outcome.report else {
        panic!("expected churn report, got {:?}", outcome.report);
    };
    assert_eq!(report.high_risk.count, 1);
    assert_eq!(report.medium_risk.count, 1);
    assert_eq!(report.high_risk.customers[0].id, report.medium_risk.customers[0].id);
    assert_eq!(report.low_risk.count, 1);
}

#[test]
fn test_revenue_forecast_needs_five_customers() {
    let customers: Vec<_> = ten_customers().into_iter().take(4).collect();

    let outcome = AnalyticsEngine::new(now()).run("Forecast revenue", &customers);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["mode"], "revenue");
    assert_eq!(json["report"], "insufficient_data");
    assert_eq!(json["required"], 5);
    assert_eq!(json["available"], 4);
}

#[test]
fn test_revenue_forecast_over_ten_customers() {
    let outcome =
        AnalyticsEngine::new(now()).run("Predict revenue for next quarter", &ten_customers());

    let AnalyticsReport::Revenue(report) = &outcome.report else {
        panic!("expected revenue report, got {:?}", outcome.report);
    };
    assert_eq!(report.customer_count, 10);
    assert!(report.predicted_spend.is_finite());
    assert!((report.order_value_uplift - report.predicted_spend * 0.10).abs() < 1e-6);
    assert!(outcome.summary.contains("Revenue"));
}

#[test]
fn test_empty_activity_reports_no_data() {
    for query in ["churn", "forecast", "segmentation", "insights"] {
        let outcome = AnalyticsEngine::new(now()).run(query, &[]);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["report"], "no_data", "query {query:?}");
        assert_eq!(outcome.summary, "No customer data available for analysis.");
    }
}
