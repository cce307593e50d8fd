use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::PeriodKey;

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub user_id: i64,
    pub category_id: Option<i64>,
    /// Format: "YYYY-MM-DD"
    pub date: String,
    pub description: String,
    /// Negative for expenses, positive for income.
    pub amount: Decimal,
    pub created_at: String,
}

impl Transaction {
    pub fn new(
        user_id: i64,
        category_id: Option<i64>,
        date: String,
        description: String,
        amount: Decimal,
    ) -> Self {
        Self {
            id: None,
            user_id,
            category_id,
            date,
            description,
            amount,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// The budget period this transaction counts against, if it has a category.
    pub fn period_key(&self) -> Result<Option<PeriodKey>> {
        let Some(category_id) = self.category_id else {
            return Ok(None);
        };
        let date = self.parsed_date()?;
        Ok(Some(PeriodKey::new(
            self.user_id,
            category_id,
            date.year(),
            date.month(),
        )))
    }

    /// Rewrite `date` zero-padded, so `2024-6-5` is stored as `2024-06-05`
    /// and matches month-prefix queries.
    pub fn normalize_date(&mut self) -> Result<()> {
        self.date = self.parsed_date()?.format("%Y-%m-%d").to_string();
        Ok(())
    }

    fn parsed_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .with_context(|| format!("Invalid transaction date: {}", self.date))
    }

    /// The amount this transaction draws from its budget. Zero for income.
    pub fn expense_amount(&self) -> Decimal {
        if self.is_expense() {
            self.abs_amount()
        } else {
            Decimal::ZERO
        }
    }
}

/// Fields an edit may rewrite on an existing transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub amount: Option<Decimal>,
    pub category_id: Option<Option<i64>>,
    pub date: Option<String>,
    pub description: Option<String>,
}

impl TransactionEdit {
    pub(crate) fn apply_to(&self, txn: &mut Transaction) {
        if let Some(amount) = self.amount {
            txn.amount = amount;
        }
        if let Some(category_id) = self.category_id {
            txn.category_id = category_id;
        }
        if let Some(date) = &self.date {
            txn.date = date.clone();
        }
        if let Some(description) = &self.description {
            txn.description = description.clone();
        }
    }
}
