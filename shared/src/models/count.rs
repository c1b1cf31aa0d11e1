//! Physical inventory count models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a physical count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "inventory_count_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    #[default]
    InProgress,
    Completed,
    Cancelled,
}

impl CountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountStatus::InProgress => "in_progress",
            CountStatus::Completed => "completed",
            CountStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: CountStatus) -> bool {
        matches!(
            (self, next),
            (CountStatus::InProgress, CountStatus::Completed)
                | (CountStatus::InProgress, CountStatus::Cancelled)
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, CountStatus::InProgress)
    }
}

/// Counted minus expected, only once the item has been counted
pub fn count_variance(expected: Decimal, counted: Option<Decimal>) -> Option<Decimal> {
    counted.map(|counted| counted - expected)
}

/// Variance relative to the expected quantity, in percent
///
/// Undefined when nothing was expected.
pub fn variance_percentage(expected: Decimal, counted: Option<Decimal>) -> Option<Decimal> {
    if expected <= Decimal::ZERO {
        return None;
    }
    count_variance(expected, counted).map(|v| (v / expected * Decimal::from(100)).round_dp(2))
}

/// Share of count items already counted, floored to a whole percent
pub fn progress_percentage(total_items: u64, completed_items: u64) -> u32 {
    if total_items == 0 {
        return 0;
    }
    ((completed_items.min(total_items) * 100) / total_items) as u32
}

/// One row of a count's variance report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "backend", derive(utoipa::ToSchema))]
pub struct VarianceLine {
    pub product_id: uuid::Uuid,
    pub product_name: String,
    pub sku: Option<String>,
    pub expected_quantity: Decimal,
    pub counted_quantity: Option<Decimal>,
    pub variance: Option<Decimal>,
    pub variance_percentage: Option<Decimal>,
    pub unit_price: Decimal,
    pub value_impact: Option<Decimal>,
}

impl VarianceLine {
    pub fn new(
        product_id: uuid::Uuid,
        product_name: String,
        sku: Option<String>,
        expected_quantity: Decimal,
        counted_quantity: Option<Decimal>,
        unit_price: Decimal,
    ) -> Self {
        let variance = count_variance(expected_quantity, counted_quantity);
        Self {
            product_id,
            product_name,
            sku,
            expected_quantity,
            counted_quantity,
            variance,
            variance_percentage: variance_percentage(expected_quantity, counted_quantity),
            unit_price,
            value_impact: variance.map(|v| v * unit_price),
        }
    }
}

/// Totals across a variance report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "backend", derive(utoipa::ToSchema))]
pub struct VarianceSummary {
    pub total_items: u64,
    pub counted_items: u64,
    pub items_with_variance: u64,
    pub total_value_impact: Decimal,
    pub progress_percentage: u32,
}

impl VarianceSummary {
    pub fn from_lines(lines: &[VarianceLine]) -> Self {
        let total_items = lines.len() as u64;
        let counted_items = lines
            .iter()
            .filter(|l| l.counted_quantity.is_some())
            .count() as u64;
        let items_with_variance = lines
            .iter()
            .filter(|l| l.variance.is_some_and(|v| !v.is_zero()))
            .count() as u64;
        let total_value_impact = lines.iter().filter_map(|l| l.value_impact).sum();

        Self {
            total_items,
            counted_items,
            items_with_variance,
            total_value_impact,
            progress_percentage: progress_percentage(total_items, counted_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_variance_requires_count() {
        assert_eq!(count_variance(dec!(10), None), None);
        assert_eq!(count_variance(dec!(10), Some(dec!(8.5))), Some(dec!(-1.5)));
    }

    #[test]
    fn test_variance_percentage() {
        assert_eq!(
            variance_percentage(dec!(8), Some(dec!(6))),
            Some(dec!(-25.00))
        );
        assert_eq!(variance_percentage(dec!(0), Some(dec!(3))), None);
        assert_eq!(variance_percentage(dec!(8), None), None);
    }

    #[test]
    fn test_progress_is_floored() {
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(3, 1), 33);
        assert_eq!(progress_percentage(3, 2), 66);
        assert_eq!(progress_percentage(4, 4), 100);
    }

    #[test]
    fn test_count_status_transitions() {
        assert!(CountStatus::InProgress.can_transition_to(CountStatus::Completed));
        assert!(!CountStatus::Completed.can_transition_to(CountStatus::Cancelled));
        assert!(!CountStatus::Cancelled.is_open());
    }

    #[test]
    fn test_variance_summary() {
        let lines = vec![
            VarianceLine::new(
                Uuid::new_v4(),
                "Gin".into(),
                None,
                dec!(10),
                Some(dec!(9)),
                dec!(20),
            ),
            VarianceLine::new(
                Uuid::new_v4(),
                "Tonic".into(),
                Some("TN-1".into()),
                dec!(24),
                Some(dec!(24)),
                dec!(1.5),
            ),
            VarianceLine::new(Uuid::new_v4(), "Lime".into(), None, dec!(5), None, dec!(0.3)),
        ];
        let summary = VarianceSummary::from_lines(&lines);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.counted_items, 2);
        assert_eq!(summary.items_with_variance, 1);
        assert_eq!(summary.total_value_impact, dec!(-20));
        assert_eq!(summary.progress_percentage, 66);
    }
}
