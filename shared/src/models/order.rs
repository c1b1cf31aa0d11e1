//! Purchase order models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Draft,
    Pending,
    Placed,
    Received,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Placed => "placed",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_place(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Pending)
    }

    pub fn can_receive(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    pub fn can_cancel(&self) -> bool {
        !matches!(self, OrderStatus::Received | OrderStatus::Cancelled)
    }

    /// Header fields may change until the order is closed
    pub fn is_editable(&self) -> bool {
        !matches!(self, OrderStatus::Received | OrderStatus::Cancelled)
    }

    /// Line items and deletion are limited to orders not yet sent
    pub fn items_editable(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Pending)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match next {
            OrderStatus::Draft => false,
            OrderStatus::Pending => matches!(self, OrderStatus::Draft),
            OrderStatus::Placed => self.can_place(),
            OrderStatus::Received => self.can_receive(),
            OrderStatus::Cancelled => self.can_cancel(),
        }
    }
}

/// How much of an order line has arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ReceivingStatus {
    NotReceived,
    PartiallyReceived,
    FullyReceived,
}

impl ReceivingStatus {
    pub fn from_quantities(ordered: Decimal, received: Decimal) -> Self {
        if received <= Decimal::ZERO {
            ReceivingStatus::NotReceived
        } else if received < ordered {
            ReceivingStatus::PartiallyReceived
        } else {
            ReceivingStatus::FullyReceived
        }
    }
}

pub fn line_total_price(quantity: Decimal, unit_price: Decimal) -> Decimal {
    quantity * unit_price
}

/// Money totals for an order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(utoipa::ToSchema))]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Subtotal over `(quantity, unit_price)` lines plus shipping and tax, less discount
    pub fn calculate<I>(lines: I, shipping_cost: Decimal, tax: Decimal, discount: Decimal) -> Self
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let subtotal: Decimal = lines
            .into_iter()
            .map(|(quantity, unit_price)| line_total_price(quantity, unit_price))
            .sum();
        Self {
            subtotal,
            shipping_cost,
            tax,
            discount,
            total: subtotal + shipping_cost + tax - discount,
        }
    }
}

/// Dates and money fields checked together whenever an order is saved
#[derive(Debug, Clone, Copy)]
pub struct OrderSchedule {
    pub status: OrderStatus,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
}

/// Reason an order header failed validation, with the offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl OrderSchedule {
    pub fn validate(&self, today: NaiveDate) -> Result<(), OrderFieldError> {
        let err = |field, message| Err(OrderFieldError { field, message });

        if matches!(self.status, OrderStatus::Placed | OrderStatus::Received)
            && self.order_date.is_none()
        {
            return err("order_date", "Order date is required for placed orders");
        }
        if self.status == OrderStatus::Received && self.actual_delivery_date.is_none() {
            return err(
                "actual_delivery_date",
                "Actual delivery date is required for received orders",
            );
        }
        if let Some(order_date) = self.order_date {
            if order_date > today {
                return err("order_date", "Order date cannot be in the future");
            }
            if let Some(expected) = self.expected_delivery_date {
                if expected < order_date {
                    return err(
                        "expected_delivery_date",
                        "Expected delivery date cannot be before order date",
                    );
                }
            }
            if let Some(actual) = self.actual_delivery_date {
                if actual < order_date {
                    return err(
                        "actual_delivery_date",
                        "Actual delivery date cannot be before order date",
                    );
                }
            }
        }
        if let Some(actual) = self.actual_delivery_date {
            if actual > today {
                return err(
                    "actual_delivery_date",
                    "Actual delivery date cannot be in the future",
                );
            }
        }
        Ok(())
    }
}

/// `ORD-` followed by the first eight hex digits of a fresh UUID, upper-cased
pub fn generate_order_number() -> String {
    order_number_from(Uuid::new_v4())
}

pub fn order_number_from(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("ORD-{}", hex[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_order_transitions() {
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Placed));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Received));
        assert!(!OrderStatus::Draft.can_transition_to(OrderStatus::Received));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Placed.items_editable());
    }

    #[test]
    fn test_receiving_status() {
        assert_eq!(
            ReceivingStatus::from_quantities(dec!(12), dec!(0)),
            ReceivingStatus::NotReceived
        );
        assert_eq!(
            ReceivingStatus::from_quantities(dec!(12), dec!(6)),
            ReceivingStatus::PartiallyReceived
        );
        assert_eq!(
            ReceivingStatus::from_quantities(dec!(12), dec!(12)),
            ReceivingStatus::FullyReceived
        );
    }

    #[test]
    fn test_order_totals() {
        let totals = OrderTotals::calculate(
            vec![(dec!(12), dec!(18.50)), (dec!(2), dec!(45.00))],
            dec!(15.00),
            dec!(24.20),
            dec!(10.00),
        );
        assert_eq!(totals.subtotal, dec!(312.00));
        assert_eq!(totals.total, dec!(341.20));
    }

    #[test]
    fn test_schedule_validation() {
        let today = date(2024, 5, 10);
        let placed_without_date = OrderSchedule {
            status: OrderStatus::Placed,
            order_date: None,
            expected_delivery_date: None,
            actual_delivery_date: None,
        };
        assert_eq!(
            placed_without_date.validate(today).unwrap_err().field,
            "order_date"
        );

        let early_delivery = OrderSchedule {
            status: OrderStatus::Placed,
            order_date: Some(date(2024, 5, 8)),
            expected_delivery_date: Some(date(2024, 5, 7)),
            actual_delivery_date: None,
        };
        assert_eq!(
            early_delivery.validate(today).unwrap_err().field,
            "expected_delivery_date"
        );

        let received = OrderSchedule {
            status: OrderStatus::Received,
            order_date: Some(date(2024, 5, 8)),
            expected_delivery_date: Some(date(2024, 5, 12)),
            actual_delivery_date: Some(date(2024, 5, 10)),
        };
        assert!(received.validate(today).is_ok());
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert_eq!(number.len(), 12);
        assert!(number.starts_with("ORD-"));
        assert!(number[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
