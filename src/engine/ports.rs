//! Seams between the budget engine and the things it depends on.
//!
//! `Database` implements every trait here; tests substitute recording fakes.

use anyhow::Result;
use rust_decimal::Decimal;

use crate::models::{Budget, Category, NotifyType, PeriodKey, User};

/// Outcome of a mutation closure passed to [`BudgetStore::read_modify_write`].
pub(crate) enum Mutation<T> {
    Changed(T),
    Unchanged(T),
}

/// Durable holder of the full budget collection.
pub(crate) trait BudgetStore {
    fn load_all(&self) -> Result<Vec<Budget>>;

    /// Replace the whole collection.
    fn persist_all(&self, budgets: &[Budget]) -> Result<()>;

    fn find_by_key(&self, key: &PeriodKey) -> Result<Option<Budget>> {
        Ok(self.load_all()?.into_iter().find(|b| b.matches(key)))
    }

    /// One load/mutate/persist cycle. Nothing is written when the closure
    /// reports `Unchanged` or fails.
    fn read_modify_write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Budget>) -> Result<Mutation<T>>,
    {
        run_cycle(self, f)
    }
}

/// The plain load/mutate/persist sequence, for stores that wrap it in
/// their own transaction.
pub(crate) fn run_cycle<S, T, F>(store: &S, f: F) -> Result<T>
where
    S: BudgetStore + ?Sized,
    F: FnOnce(&mut Vec<Budget>) -> Result<Mutation<T>>,
{
    let mut budgets = store.load_all()?;
    match f(&mut budgets)? {
        Mutation::Changed(out) => {
            store.persist_all(&budgets)?;
            Ok(out)
        }
        Mutation::Unchanged(out) => Ok(out),
    }
}

pub(crate) trait TransactionLedger {
    /// Sum of expenses (as a positive number) for the period.
    fn get_total_expenses(&self, key: &PeriodKey) -> Result<Decimal>;
}

pub(crate) trait NotificationSink {
    fn add_notification(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        notify_type: NotifyType,
    ) -> Result<()>;
}

pub(crate) trait CategoryDirectory {
    fn get_category_by_id(&self, id: i64) -> Result<Option<Category>>;
}

pub(crate) trait UserDirectory {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
}
