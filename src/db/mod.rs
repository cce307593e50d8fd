mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::engine::{
    run_cycle, BudgetStore, CategoryDirectory, Mutation, NotificationSink, TransactionLedger,
    UserDirectory,
};
use crate::models::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BUDGET_COLUMNS: &str = "id, user_id, category_id, year, month, limit_amount, current_amount, note, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, user_id, category_id, date, description, amount, created_at";

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set busy timeout")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        db.seed_default_categories()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        db.seed_default_categories()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            // Fresh database - apply full schema
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    fn seed_default_categories(&mut self) -> Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let defaults = [
            "Bills & Subscriptions",
            "Education",
            "Entertainment",
            "Food & Dining",
            "Gifts & Donations",
            "Groceries",
            "Health & Fitness",
            "Housing",
            "Income",
            "Insurance",
            "Personal Care",
            "Shopping",
            "Transportation",
            "Travel",
            "Utilities",
        ];

        let tx = self.conn.transaction()?;
        for name in &defaults {
            tx.execute(
                "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                params![name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Run `f` atomically: everything it writes is kept, or nothing is.
    ///
    /// The outermost call takes the write lock up front with `BEGIN IMMEDIATE`,
    /// so a writer in another process waits out the busy timeout instead of
    /// failing when its read is upgraded. Nested calls become savepoints.
    pub(crate) fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let (begin, commit, rollback) = if self.conn.is_autocommit() {
            ("BEGIN IMMEDIATE", "COMMIT", "ROLLBACK")
        } else {
            (
                "SAVEPOINT budgetwatch",
                "RELEASE budgetwatch",
                "ROLLBACK TO budgetwatch; RELEASE budgetwatch",
            )
        };
        self.conn
            .execute_batch(begin)
            .context("Failed to begin transaction")?;
        let result = f().and_then(|out| {
            self.conn
                .execute_batch(commit)
                .context("Failed to commit transaction")?;
            Ok(out)
        });
        if result.is_err() {
            if let Err(e) = self.conn.execute_batch(rollback) {
                warn!(error = %e, "rollback failed");
            }
        }
        result
    }

    // ── Users ─────────────────────────────────────────────────

    pub(crate) fn insert_user(&self, user: &User) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
            params![user.name, user.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM users ORDER BY id")?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE name = ?1 COLLATE NOCASE",
                params![name],
                user_from_row,
            )
            .optional()?)
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn get_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let categories = self.get_categories()?;
        Ok(Category::find_by_name(&categories, name).cloned())
    }

    pub(crate) fn insert_category(&self, cat: &Category) -> Result<i64> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", params![cat.name])?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Transactions ──────────────────────────────────────────

    pub(crate) fn insert_transaction(&self, txn: &Transaction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (user_id, category_id, date, description, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                txn.user_id,
                txn.category_id,
                txn.date,
                txn.description,
                txn.amount.to_string(),
                txn.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
                params![id],
                transaction_from_row,
            )
            .optional()?)
    }

    pub(crate) fn get_transactions(
        &self,
        user_id: i64,
        month: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE user_id = ?1 AND date LIKE ?2
             ORDER BY date DESC, id DESC"
        ))?;
        let pattern = format!("{}%", month.unwrap_or(""));
        let rows = stmt.query_map(params![user_id, pattern], transaction_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn update_transaction(&self, txn: &Transaction) -> Result<bool> {
        let Some(id) = txn.id else {
            return Ok(false);
        };
        let changed = self.conn.execute(
            "UPDATE transactions SET category_id = ?1, date = ?2, description = ?3, amount = ?4
             WHERE id = ?5",
            params![
                txn.category_id,
                txn.date,
                txn.description,
                txn.amount.to_string(),
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub(crate) fn delete_transaction(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ── Notifications ─────────────────────────────────────────

    pub(crate) fn get_notifications(
        &self,
        user_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let sql = if unread_only {
            "SELECT id, user_id, title, content, notify_type, is_read, created_at
             FROM notifications WHERE user_id = ?1 AND is_read = 0 ORDER BY id DESC"
        } else {
            "SELECT id, user_id, title, content, notify_type, is_read, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY id DESC"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Notification {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                title: row.get(2)?,
                content: row.get(3)?,
                notify_type: NotifyType::parse(&row.get::<_, String>(4)?),
                is_read: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn mark_notifications_read(&self, user_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            params![user_id],
        )?)
    }
}

// ── Budget store ──────────────────────────────────────────────

impl BudgetStore for Database {
    fn load_all(&self) -> Result<Vec<Budget>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets ORDER BY position"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(Budget {
                id: row.get(0)?,
                user_id: row.get(1)?,
                category_id: row.get(2)?,
                year: row.get(3)?,
                month: row.get(4)?,
                limit: decimal_column(row, 5)?,
                current_amount: decimal_column(row, 6)?,
                note: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to load budgets")
    }

    fn persist_all(&self, budgets: &[Budget]) -> Result<()> {
        self.atomically(|| {
            self.conn.execute("DELETE FROM budgets", [])?;
            let mut stmt = self.conn.prepare_cached(&format!(
                "INSERT INTO budgets (position, {BUDGET_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;
            for (position, b) in budgets.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    b.id,
                    b.user_id,
                    b.category_id,
                    b.year,
                    b.month,
                    b.limit.to_string(),
                    b.current_amount.to_string(),
                    b.note,
                    b.created_at,
                    b.updated_at,
                ])?;
            }
            debug!(count = budgets.len(), "budgets persisted");
            Ok(())
        })
        .context("Failed to persist budgets")
    }

    fn read_modify_write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Budget>) -> Result<Mutation<T>>,
    {
        self.atomically(|| run_cycle(self, f))
    }
}

// ── Ledger / directories / sink ───────────────────────────────

impl TransactionLedger for Database {
    fn get_total_expenses(&self, key: &PeriodKey) -> Result<Decimal> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT amount FROM transactions
             WHERE user_id = ?1 AND category_id = ?2 AND date LIKE ?3",
        )?;
        let pattern = format!("{}%", key.month_prefix());
        let rows = stmt.query_map(params![key.user_id, key.category_id, pattern], |row| {
            decimal_column(row, 0)
        })?;
        let mut total = Decimal::ZERO;
        for amount in rows {
            let amount = amount?;
            if amount < Decimal::ZERO {
                total += amount.abs();
            }
        }
        Ok(total)
    }
}

impl CategoryDirectory for Database {
    fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Category {
                        id: Some(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }
}

impl UserDirectory for Database {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()?)
    }
}

impl NotificationSink for Database {
    fn add_notification(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        notify_type: NotifyType,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notifications (user_id, title, content, notify_type, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                user_id,
                title,
                content,
                notify_type.as_str(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ── Row mapping ───────────────────────────────────────────────

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        amount: decimal_column(row, 5)?,
        created_at: row.get(6)?,
    })
}
