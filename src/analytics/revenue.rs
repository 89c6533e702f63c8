//! Revenue projection from a per-request linear fit.
//!
//! An ordinary least-squares model over `visits`, `order_count` and
//! `avg_order_value` is fitted against `total_spend`, then evaluated at the
//! mean feature vector. The result is a rough point estimate used as the
//! next-period projection; it is not a time-series forecast.

use serde::Serialize;

use super::records::DerivedCustomerRecord;

/// Minimum number of customers needed to attempt a fit.
pub const MIN_RECORDS_FOR_FORECAST: usize = 5;

/// Uplift applied to the prediction for the order-value scenario.
const ORDER_VALUE_UPLIFT: f64 = 0.10;

/// Uplift applied to the prediction for the retention scenario.
const RETENTION_UPLIFT: f64 = 0.05;

const PIVOT_EPSILON: f64 = 1e-9;

/// Fitted coefficients of the spend model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpendModel {
    pub intercept: f64,
    pub visits: f64,
    pub order_count: f64,
    pub avg_order_value: f64,
}

impl SpendModel {
    /// Fits the model by solving the normal equations.
    ///
    /// Rank-deficient designs (e.g. a constant feature) still yield a
    /// least-squares solution: dependent coefficients are fixed at zero.
    pub fn fit(records: &[DerivedCustomerRecord]) -> Self {
        let mut xtx = [[0.0_f64; 4]; 4];
        let mut xty = [0.0_f64; 4];

        for record in records {
            let x = features(record);
            for i in 0..4 {
                xty[i] += x[i] * record.total_spend;
                for j in 0..4 {
                    xtx[i][j] += x[i] * x[j];
                }
            }
        }

        let beta = solve_least_squares(xtx, xty);
        Self {
            intercept: beta[0],
            visits: beta[1],
            order_count: beta[2],
            avg_order_value: beta[3],
        }
    }

    /// Predicts spend for a feature vector `[visits, order_count, avg_order_value]`.
    pub fn predict(&self, visits: f64, order_count: f64, avg_order_value: f64) -> f64 {
        self.intercept
            + self.visits * visits
            + self.order_count * order_count
            + self.avg_order_value * avg_order_value
    }
}

fn features(record: &DerivedCustomerRecord) -> [f64; 4] {
    [
        1.0,
        record.visits as f64,
        record.order_count as f64,
        record.avg_order_value,
    ]
}

/// Gauss-Jordan elimination with partial pivoting on a symmetric system.
///
/// Columns without a usable pivot are free variables and stay at zero.
fn solve_least_squares(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> [f64; 4] {
    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);
    let mut pivot_columns = Vec::with_capacity(4);
    let mut row = 0;

    for col in 0..4 {
        if row == 4 {
            break;
        }
        let (best, best_abs) = (row..4)
            .map(|r| (r, a[r][col].abs()))
            .fold((row, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if best_abs <= PIVOT_EPSILON * scale {
            continue;
        }
        a.swap(row, best);
        b.swap(row, best);

        let pivot = a[row][col];
        for k in 0..4 {
            a[row][k] /= pivot;
        }
        b[row] /= pivot;

        for r in 0..4 {
            if r != row {
                let factor = a[r][col];
                if factor != 0.0 {
                    for k in 0..4 {
                        a[r][k] -= factor * a[row][k];
                    }
                    b[r] -= factor * b[row];
                }
            }
        }
        pivot_columns.push(col);
        row += 1;
    }

    let mut solution = [0.0; 4];
    for (r, col) in pivot_columns.into_iter().enumerate() {
        solution[col] = b[r];
    }
    solution
}

/// Revenue projection report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueReport {
    pub customer_count: usize,
    pub total_revenue: f64,
    pub average_spend: f64,
    /// Projected spend per customer for the next period.
    pub predicted_spend: f64,
    /// Fraction of customers active within the last 30 days.
    pub retention_rate: f64,
    /// Extra revenue if average order value rises by 10%.
    pub order_value_uplift: f64,
    /// Extra revenue if retention rises by 5%.
    pub retention_uplift: f64,
    pub model: SpendModel,
}

/// Builds the revenue projection, or `None` with fewer than
/// [`MIN_RECORDS_FOR_FORECAST`] customers.
pub fn predict_revenue(records: &[DerivedCustomerRecord]) -> Option<RevenueReport> {
    if records.len() < MIN_RECORDS_FOR_FORECAST {
        return None;
    }

    let n = records.len() as f64;
    let total_revenue: f64 = records.iter().map(|r| r.total_spend).sum();
    let mean_visits = records.iter().map(|r| r.visits as f64).sum::<f64>() / n;
    let mean_orders = records.iter().map(|r| r.order_count as f64).sum::<f64>() / n;
    let mean_order_value = records.iter().map(|r| r.avg_order_value).sum::<f64>() / n;
    let retained = records.iter().filter(|r| r.active_within(30)).count();

    let model = SpendModel::fit(records);
    let predicted_spend = model.predict(mean_visits, mean_orders, mean_order_value);

    Some(RevenueReport {
        customer_count: records.len(),
        total_revenue,
        average_spend: total_revenue / n,
        predicted_spend,
        retention_rate: retained as f64 / n,
        order_value_uplift: predicted_spend * ORDER_VALUE_UPLIFT,
        retention_uplift: predicted_spend * RETENTION_UPLIFT,
        model,
    })
}

impl RevenueReport {
    /// Renders the report as narrative text.
    pub fn narrative(&self) -> String {
        format!(
            "Revenue Forecast\n\n\
             Customers analyzed: {}\n\
             Total revenue: ${:.2}\n\
             Average spend per customer: ${:.2}\n\
             Projected spend per customer next period: ${:.2}\n\
             Retention rate (active within 30 days): {:.1}%\n\n\
             Scenarios:\n\
             \x20 - Raising average order value by 10% adds about ${:.2}\n\
             \x20 - Improving retention by 5% adds about ${:.2}\n",
            self.customer_count,
            self.total_revenue,
            self.average_spend,
            self.predicted_spend,
            self.retention_rate * 100.0,
            self.order_value_uplift,
            self.retention_uplift,
        )
    }
}
