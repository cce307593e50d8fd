use rust_decimal::Decimal;

/// Composite identity of a budget: one user, one category, one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodKey {
    pub user_id: i64,
    pub category_id: i64,
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(user_id: i64, category_id: i64, year: i32, month: u32) -> Self {
        Self {
            user_id,
            category_id,
            year,
            month,
        }
    }

    /// Format: "YYYY-MM"
    pub fn month_prefix(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: String,
    pub user_id: i64,
    pub category_id: i64,
    pub year: i32,
    pub month: u32,
    pub limit: Decimal,
    /// Remaining balance for the period. Negative once overspent.
    pub current_amount: Decimal,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Budget {
    pub fn key(&self) -> PeriodKey {
        PeriodKey::new(self.user_id, self.category_id, self.year, self.month)
    }

    pub fn matches(&self, key: &PeriodKey) -> bool {
        self.key() == *key
    }

    pub fn spent(&self) -> Decimal {
        self.limit - self.current_amount
    }

    pub fn is_overspent(&self) -> bool {
        self.current_amount < Decimal::ZERO
    }
}

/// Caller-supplied fields for an upsert.
#[derive(Debug, Clone)]
pub struct BudgetDraft {
    pub key: PeriodKey,
    pub limit: Decimal,
    pub note: Option<String>,
}

impl BudgetDraft {
    pub fn new(key: PeriodKey, limit: Decimal) -> Self {
        Self {
            key,
            limit,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Partial update by identity. `None` leaves the field as it is.
#[derive(Debug, Clone, Default)]
pub struct BudgetPatch {
    pub user_id: Option<i64>,
    pub category_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub limit: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    pub note: Option<String>,
}

impl BudgetPatch {
    /// Merge into `budget`. The id can't be patched and the owner is kept
    /// unless the patch names a new one.
    pub(crate) fn apply_to(&self, budget: &mut Budget) {
        if let Some(user_id) = self.user_id {
            budget.user_id = user_id;
        }
        if let Some(category_id) = self.category_id {
            budget.category_id = category_id;
        }
        if let Some(year) = self.year {
            budget.year = year;
        }
        if let Some(month) = self.month {
            budget.month = month;
        }
        if let Some(limit) = self.limit {
            budget.limit = limit;
        }
        if let Some(current) = self.current_amount {
            budget.current_amount = current;
        }
        if let Some(note) = &self.note {
            budget.note = Some(note.clone());
        }
    }
}
