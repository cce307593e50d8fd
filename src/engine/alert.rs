use rust_decimal::Decimal;

use crate::models::Budget;
use crate::util::format_amount;

pub(crate) const UNKNOWN_CATEGORY: &str = "Unknown category";
pub(crate) const UNKNOWN_USER: &str = "there";

/// Figures for one overspend notification, taken right after an expense
/// pushed the remaining balance below zero.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverspendAlert {
    pub user_id: i64,
    pub category_id: i64,
    pub year: i32,
    pub month: u32,
    pub limit: Decimal,
    pub overage: Decimal,
    pub total_spent: Decimal,
}

impl OverspendAlert {
    /// `None` unless `amount` was a real expense and the balance is now negative.
    pub(crate) fn check(budget: &Budget, amount: Decimal) -> Option<Self> {
        if amount <= Decimal::ZERO || budget.current_amount >= Decimal::ZERO {
            return None;
        }
        Some(Self {
            user_id: budget.user_id,
            category_id: budget.category_id,
            year: budget.year,
            month: budget.month,
            limit: budget.limit,
            overage: -budget.current_amount,
            total_spent: budget.limit - budget.current_amount,
        })
    }

    pub(crate) fn title(&self, category_name: &str) -> String {
        format!("Budget exceeded: {category_name}")
    }

    pub(crate) fn content(&self, user_name: &str, category_name: &str) -> String {
        format!(
            "Hi {user_name}, you are {} over your {category_name} budget for {:02}/{}. \
             Spent {} of {}.",
            format_amount(self.overage),
            self.month,
            self.year,
            format_amount(self.total_spent),
            format_amount(self.limit),
        )
    }
}
