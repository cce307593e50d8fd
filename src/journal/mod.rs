//! Posting transactions. Every ledger write here is paired with the matching
//! budget adjustment inside one transaction, so the cached remaining balances
//! can't drift from the ledger through a forgotten call.

use anyhow::Result;
use rust_decimal::Decimal;
use tracing::debug;

use crate::db::Database;
use crate::engine::BudgetEngine;
use crate::models::{PeriodKey, Transaction, TransactionEdit};

pub(crate) struct Journal<'a> {
    db: &'a Database,
    engine: BudgetEngine<'a, Database>,
}

impl<'a> Journal<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            engine: BudgetEngine::for_database(db),
        }
    }

    pub(crate) fn record_transaction(&self, mut txn: Transaction) -> Result<Transaction> {
        txn.normalize_date()?;
        let key = txn.period_key()?;
        self.db.atomically(move || {
            let id = self.db.insert_transaction(&txn)?;
            txn.id = Some(id);
            if let Some(key) = key {
                self.draw(&key, txn.expense_amount())?;
            }
            debug!(id, amount = %txn.amount, "transaction recorded");
            Ok(txn)
        })
    }

    /// Returns `false` if there is no transaction with that id.
    pub(crate) fn delete_transaction(&self, id: i64) -> Result<bool> {
        self.db.atomically(|| {
            let Some(txn) = self.db.get_transaction_by_id(id)? else {
                return Ok(false);
            };
            let key = txn.period_key()?;
            self.db.delete_transaction(id)?;
            if let Some(key) = key {
                self.give_back(&key, txn.expense_amount())?;
            }
            debug!(id, "transaction deleted");
            Ok(true)
        })
    }

    pub(crate) fn edit_transaction(
        &self,
        id: i64,
        edit: &TransactionEdit,
    ) -> Result<Option<Transaction>> {
        self.db.atomically(|| {
            let Some(before) = self.db.get_transaction_by_id(id)? else {
                return Ok(None);
            };
            let mut after = before.clone();
            edit.apply_to(&mut after);
            after.normalize_date()?;

            let old_key = before.period_key()?;
            let new_key = after.period_key()?;
            self.db.update_transaction(&after)?;

            let (old_amount, new_amount) = (before.expense_amount(), after.expense_amount());
            match (old_key, new_key) {
                (Some(old), Some(new)) if old == new => {
                    let delta = new_amount - old_amount;
                    if delta > Decimal::ZERO {
                        self.draw(&new, delta)?;
                    } else {
                        self.give_back(&new, -delta)?;
                    }
                }
                _ => {
                    if let Some(old) = old_key {
                        self.give_back(&old, old_amount)?;
                    }
                    if let Some(new) = new_key {
                        self.draw(&new, new_amount)?;
                    }
                }
            }
            debug!(id, "transaction edited");
            Ok(Some(after))
        })
    }

    fn draw(&self, key: &PeriodKey, amount: Decimal) -> Result<()> {
        if amount > Decimal::ZERO {
            self.engine.apply_expense(key, amount)?;
        }
        Ok(())
    }

    fn give_back(&self, key: &PeriodKey, amount: Decimal) -> Result<()> {
        if amount > Decimal::ZERO {
            self.engine.revert_expense(key, amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
