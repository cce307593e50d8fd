//! Budget engine: keeps each budget's remaining balance reconciled with the
//! transaction ledger.
//!
//! Two paths write `current_amount`:
//! - limit changes recompute it from the ledger total, exactly;
//! - expense postings adjust it by the caller's delta without touching the
//!   ledger. Those deltas must come through [`crate::journal::Journal`] so
//!   every ledger write is paired with exactly one adjustment.

mod alert;
mod ports;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Budget, BudgetDraft, BudgetPatch, NotifyType, PeriodKey};

use alert::{OverspendAlert, UNKNOWN_CATEGORY, UNKNOWN_USER};
pub(crate) use ports::{
    run_cycle, BudgetStore, CategoryDirectory, Mutation, NotificationSink, TransactionLedger,
    UserDirectory,
};

pub(crate) struct BudgetEngine<'a, S> {
    store: &'a S,
    ledger: Option<&'a dyn TransactionLedger>,
    notifier: Option<&'a dyn NotificationSink>,
    categories: Option<&'a dyn CategoryDirectory>,
    users: Option<&'a dyn UserDirectory>,
}

impl<'a> BudgetEngine<'a, Database> {
    /// Engine with every collaborator backed by the same database.
    pub(crate) fn for_database(db: &'a Database) -> Self {
        Self::new(db)
            .with_ledger(db)
            .with_notifier(db)
            .with_categories(db)
            .with_users(db)
    }
}

impl<'a, S: BudgetStore> BudgetEngine<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self {
            store,
            ledger: None,
            notifier: None,
            categories: None,
            users: None,
        }
    }

    pub(crate) fn with_ledger(mut self, ledger: &'a dyn TransactionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub(crate) fn with_notifier(mut self, notifier: &'a dyn NotificationSink) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub(crate) fn with_categories(mut self, categories: &'a dyn CategoryDirectory) -> Self {
        self.categories = Some(categories);
        self
    }

    pub(crate) fn with_users(mut self, users: &'a dyn UserDirectory) -> Self {
        self.users = Some(users);
        self
    }

    // ── Upsert / update ───────────────────────────────────────

    /// Create the budget for `draft.key`, or update the one that already
    /// exists. Either way `current_amount` is recomputed from the ledger.
    pub(crate) fn create_or_update_budget(&self, draft: BudgetDraft) -> Result<Budget> {
        let key = draft.key;
        self.store.read_modify_write(|budgets| {
            let actual_spent = self.actual_spent(&key);
            let now = now();

            if let Some(existing) = budgets.iter_mut().find(|b| b.matches(&key)) {
                existing.limit = draft.limit;
                if let Some(note) = draft.note {
                    existing.note = Some(note);
                }
                existing.current_amount = existing.limit - actual_spent;
                existing.updated_at = now;
                debug!(id = %existing.id, limit = %existing.limit, current = %existing.current_amount, "budget updated");
                return Ok(Mutation::Changed(existing.clone()));
            }

            let budget = Budget {
                id: Uuid::new_v4().to_string(),
                user_id: key.user_id,
                category_id: key.category_id,
                year: key.year,
                month: key.month,
                limit: draft.limit,
                current_amount: draft.limit - actual_spent,
                note: draft.note,
                created_at: now.clone(),
                updated_at: now,
            };
            debug!(id = %budget.id, limit = %budget.limit, current = %budget.current_amount, "budget created");
            budgets.push(budget.clone());
            Ok(Mutation::Changed(budget))
        })
    }

    /// Partial update by id. Returns `false` if no budget has that id.
    pub(crate) fn update_budget(&self, id: &str, patch: &BudgetPatch) -> Result<bool> {
        self.store.read_modify_write(|budgets| {
            let Some(pos) = budgets.iter().position(|b| b.id == id) else {
                return Ok(Mutation::Unchanged(false));
            };

            let mut updated = budgets[pos].clone();
            patch.apply_to(&mut updated);

            let key = updated.key();
            if budgets.iter().any(|b| b.id != id && b.matches(&key)) {
                bail!(
                    "A budget already exists for user {} category {} in {}",
                    key.user_id,
                    key.category_id,
                    key.month_prefix()
                );
            }

            // A new limit resets any drift from incremental adjustments.
            if let Some(limit) = patch.limit {
                updated.current_amount = limit - self.actual_spent(&key);
            }
            updated.updated_at = now();
            debug!(id, current = %updated.current_amount, "budget patched");
            budgets[pos] = updated;
            Ok(Mutation::Changed(true))
        })
    }

    pub(crate) fn delete_budget(&self, id: &str) -> Result<bool> {
        self.store.read_modify_write(|budgets| {
            let before = budgets.len();
            budgets.retain(|b| b.id != id);
            if budgets.len() == before {
                Ok(Mutation::Unchanged(false))
            } else {
                debug!(id, "budget deleted");
                Ok(Mutation::Changed(true))
            }
        })
    }

    // ── Incremental apply / revert ────────────────────────────

    /// Draw `amount` from the budget for `key`. Returns `false` when the
    /// period has no budget, which is not an error.
    ///
    /// Every call that leaves the balance negative raises its own alert, even
    /// if the budget was already overspent.
    pub(crate) fn apply_expense(&self, key: &PeriodKey, amount: Decimal) -> Result<bool> {
        let outcome = self.store.read_modify_write(|budgets| {
            let Some(budget) = budgets.iter_mut().find(|b| b.matches(key)) else {
                debug!(?key, "no budget for period, expense not tracked");
                return Ok(Mutation::Unchanged(None));
            };
            budget.current_amount -= amount;
            budget.updated_at = now();
            Ok(Mutation::Changed(Some(OverspendAlert::check(budget, amount))))
        })?;

        match outcome {
            None => Ok(false),
            Some(alert) => {
                if let Some(alert) = alert {
                    self.notify_overspend(&alert);
                }
                Ok(true)
            }
        }
    }

    /// Give `amount` back to the budget for `key`. Never alerts.
    pub(crate) fn revert_expense(&self, key: &PeriodKey, amount: Decimal) -> Result<bool> {
        self.store.read_modify_write(|budgets| {
            let Some(budget) = budgets.iter_mut().find(|b| b.matches(key)) else {
                return Ok(Mutation::Unchanged(false));
            };
            budget.current_amount += amount;
            budget.updated_at = now();
            Ok(Mutation::Changed(true))
        })
    }

    // ── Queries ───────────────────────────────────────────────

    pub(crate) fn get_all(&self) -> Result<Vec<Budget>> {
        let mut budgets = self.store.load_all()?;
        sort_by_period(&mut budgets);
        Ok(budgets)
    }

    pub(crate) fn get_by_user(&self, user_id: i64) -> Result<Vec<Budget>> {
        let mut budgets = self.get_all()?;
        budgets.retain(|b| b.user_id == user_id);
        Ok(budgets)
    }

    pub(crate) fn get_by_month(
        &self,
        year: i32,
        month: u32,
        user_id: Option<i64>,
    ) -> Result<Vec<Budget>> {
        let mut budgets = self.get_all()?;
        budgets.retain(|b| {
            b.year == year && b.month == month && user_id.map_or(true, |u| b.user_id == u)
        });
        Ok(budgets)
    }

    pub(crate) fn get_by_id(&self, id: &str) -> Result<Option<Budget>> {
        Ok(self.store.load_all()?.into_iter().find(|b| b.id == id))
    }

    // ── Collaborators ─────────────────────────────────────────

    fn actual_spent(&self, key: &PeriodKey) -> Decimal {
        let Some(ledger) = self.ledger else {
            warn!(?key, "no transaction ledger available, assuming nothing spent");
            return Decimal::ZERO;
        };
        match ledger.get_total_expenses(key) {
            Ok(total) => total,
            Err(e) => {
                warn!(?key, error = %e, "ledger query failed, assuming nothing spent");
                Decimal::ZERO
            }
        }
    }

    fn notify_overspend(&self, alert: &OverspendAlert) {
        let (Some(sink), Some(categories), Some(users)) =
            (self.notifier, self.categories, self.users)
        else {
            warn!(
                user_id = alert.user_id,
                category_id = alert.category_id,
                overage = %alert.overage,
                "overspend alert skipped, notification collaborators missing"
            );
            return;
        };

        let category_name = match categories.get_category_by_id(alert.category_id) {
            Ok(Some(category)) => category.name,
            Ok(None) => UNKNOWN_CATEGORY.to_string(),
            Err(e) => {
                warn!(category_id = alert.category_id, error = %e, "category lookup failed");
                UNKNOWN_CATEGORY.to_string()
            }
        };
        let user_name = match users.get_user_by_id(alert.user_id) {
            Ok(Some(user)) => user.name,
            Ok(None) => UNKNOWN_USER.to_string(),
            Err(e) => {
                warn!(user_id = alert.user_id, error = %e, "user lookup failed");
                UNKNOWN_USER.to_string()
            }
        };

        let title = alert.title(&category_name);
        let content = alert.content(&user_name, &category_name);
        match sink.add_notification(alert.user_id, &title, &content, NotifyType::BudgetAlert) {
            Ok(()) => info!(
                user_id = alert.user_id,
                category = %category_name,
                overage = %alert.overage,
                "overspend alert sent"
            ),
            Err(e) => warn!(user_id = alert.user_id, error = %e, "failed to deliver overspend alert"),
        }
    }
}

fn sort_by_period(budgets: &mut [Budget]) {
    budgets.sort_by(|a, b| {
        (a.year, a.month, a.category_id, a.user_id).cmp(&(b.year, b.month, b.category_id, b.user_id))
    });
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
