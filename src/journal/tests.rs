#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;
use crate::engine::{BudgetStore, TransactionLedger};
use crate::models::{BudgetDraft, User};

struct Fixture {
    db: Database,
    user_id: i64,
    food_id: i64,
    travel_id: i64,
}

fn setup() -> Fixture {
    let db = Database::open_in_memory().unwrap();
    let user_id = db.insert_user(&User::new("Alice".into())).unwrap();
    let cat = |name: &str| db.get_category_by_name(name).unwrap().unwrap().id.unwrap();
    let food_id = cat("Food & Dining");
    let travel_id = cat("Travel");
    Fixture {
        db,
        user_id,
        food_id,
        travel_id,
    }
}

impl Fixture {
    fn june(&self, category_id: i64) -> PeriodKey {
        PeriodKey::new(self.user_id, category_id, 2024, 6)
    }

    fn budget_for(&self, category_id: i64, limit: Decimal) {
        BudgetEngine::for_database(&self.db)
            .create_or_update_budget(BudgetDraft::new(self.june(category_id), limit))
            .unwrap();
    }

    fn remaining(&self, category_id: i64) -> Decimal {
        self.db
            .find_by_key(&self.june(category_id))
            .unwrap()
            .unwrap()
            .current_amount
    }

    fn txn(&self, category_id: Option<i64>, amount: Decimal) -> Transaction {
        Transaction::new(
            self.user_id,
            category_id,
            "2024-06-12".into(),
            "Test".into(),
            amount,
        )
    }
}

#[test]
fn test_record_expense_draws_from_budget() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));

    let journal = Journal::new(&fx.db);
    let txn = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-45.50)))
        .unwrap();
    assert!(txn.id.is_some());
    assert_eq!(fx.remaining(fx.food_id), dec!(154.50));
    assert_eq!(fx.db.get_total_expenses(&fx.june(fx.food_id)).unwrap(), dec!(45.50));
}

#[test]
fn test_record_income_leaves_budget_alone() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));

    Journal::new(&fx.db)
        .record_transaction(fx.txn(Some(fx.food_id), dec!(80)))
        .unwrap();
    assert_eq!(fx.remaining(fx.food_id), dec!(200));
}

#[test]
fn test_record_without_budget_still_hits_ledger() {
    let fx = setup();
    Journal::new(&fx.db)
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-10)))
        .unwrap();
    assert_eq!(fx.db.get_transactions(fx.user_id, None).unwrap().len(), 1);
    assert!(fx.db.load_all().unwrap().is_empty());
}

#[test]
fn test_record_overspend_notifies() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(100000));

    Journal::new(&fx.db)
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-150000)))
        .unwrap();
    assert_eq!(fx.remaining(fx.food_id), dec!(-50000));
    let notes = fx.db.get_notifications(fx.user_id, false).unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].content.contains("$50,000.00"));
}

#[test]
fn test_delete_restores_budget() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));
    let journal = Journal::new(&fx.db);

    let txn = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-120)))
        .unwrap();
    assert!(journal.delete_transaction(txn.id.unwrap()).unwrap());
    assert_eq!(fx.remaining(fx.food_id), dec!(200));
    assert!(fx.db.get_transaction_by_id(txn.id.unwrap()).unwrap().is_none());
    assert!(!journal.delete_transaction(txn.id.unwrap()).unwrap());
}

#[test]
fn test_edit_amount_applies_net_difference() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));
    let journal = Journal::new(&fx.db);
    let id = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-50)))
        .unwrap()
        .id
        .unwrap();

    let grow = TransactionEdit {
        amount: Some(dec!(-80)),
        ..TransactionEdit::default()
    };
    journal.edit_transaction(id, &grow).unwrap().unwrap();
    assert_eq!(fx.remaining(fx.food_id), dec!(120));

    let shrink = TransactionEdit {
        amount: Some(dec!(-20)),
        ..TransactionEdit::default()
    };
    journal.edit_transaction(id, &shrink).unwrap().unwrap();
    assert_eq!(fx.remaining(fx.food_id), dec!(180));
    assert_eq!(fx.db.get_total_expenses(&fx.june(fx.food_id)).unwrap(), dec!(20));
}

#[test]
fn test_edit_category_moves_the_delta() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));
    fx.budget_for(fx.travel_id, dec!(1000));
    let journal = Journal::new(&fx.db);
    let id = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-75)))
        .unwrap()
        .id
        .unwrap();

    let edit = TransactionEdit {
        category_id: Some(Some(fx.travel_id)),
        ..TransactionEdit::default()
    };
    let edited = journal.edit_transaction(id, &edit).unwrap().unwrap();
    assert_eq!(edited.category_id, Some(fx.travel_id));
    assert_eq!(fx.remaining(fx.food_id), dec!(200));
    assert_eq!(fx.remaining(fx.travel_id), dec!(925));
}

#[test]
fn test_edit_into_next_month_frees_old_period() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));
    let journal = Journal::new(&fx.db);
    let id = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-30)))
        .unwrap()
        .id
        .unwrap();

    let edit = TransactionEdit {
        date: Some("2024-07-01".into()),
        ..TransactionEdit::default()
    };
    journal.edit_transaction(id, &edit).unwrap().unwrap();
    assert_eq!(fx.remaining(fx.food_id), dec!(200));
}

#[test]
fn test_edit_unknown_transaction() {
    let fx = setup();
    let journal = Journal::new(&fx.db);
    assert!(journal
        .edit_transaction(404, &TransactionEdit::default())
        .unwrap()
        .is_none());
}

#[test]
fn test_budget_failure_rolls_back_ledger_write() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(200));
    fx.db
        .execute_raw(
            "CREATE TRIGGER refuse_budgets BEFORE INSERT ON budgets
             BEGIN SELECT RAISE(ABORT, 'budgets are read-only'); END;",
        )
        .unwrap();

    let result = Journal::new(&fx.db).record_transaction(fx.txn(Some(fx.food_id), dec!(-60)));
    assert!(result.is_err());
    assert!(fx.db.get_transactions(fx.user_id, None).unwrap().is_empty());
    assert_eq!(fx.remaining(fx.food_id), dec!(200));
}

#[test]
fn test_ledger_and_budget_agree_after_many_postings() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(500));
    let journal = Journal::new(&fx.db);

    let mut ids = Vec::new();
    for amount in [dec!(-12.5), dec!(-40), dec!(25), dec!(-7.25), dec!(-100)] {
        ids.push(
            journal
                .record_transaction(fx.txn(Some(fx.food_id), amount))
                .unwrap()
                .id
                .unwrap(),
        );
    }
    journal.delete_transaction(ids[1]).unwrap();
    journal
        .edit_transaction(
            ids[4],
            &TransactionEdit {
                amount: Some(dec!(-60)),
                ..TransactionEdit::default()
            },
        )
        .unwrap();

    let spent = fx.db.get_total_expenses(&fx.june(fx.food_id)).unwrap();
    assert_eq!(spent, dec!(79.75));
    assert_eq!(fx.remaining(fx.food_id), dec!(500) - spent);
}

#[test]
fn test_unpadded_date_is_stored_padded() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(100));
    let journal = Journal::new(&fx.db);

    let mut txn = fx.txn(Some(fx.food_id), dec!(-40));
    txn.date = "2024-6-5".into();
    let recorded = journal.record_transaction(txn).unwrap();
    assert_eq!(recorded.date, "2024-06-05");

    let spent = fx.db.get_total_expenses(&fx.june(fx.food_id)).unwrap();
    assert_eq!(spent, dec!(40));
    assert_eq!(fx.remaining(fx.food_id), dec!(100) - spent);
    assert_eq!(
        fx.db.get_transactions(fx.user_id, Some("2024-06")).unwrap().len(),
        1
    );
}

#[test]
fn test_edit_to_unpadded_date_is_stored_padded() {
    let fx = setup();
    fx.budget_for(fx.food_id, dec!(100));
    let journal = Journal::new(&fx.db);
    let id = journal
        .record_transaction(fx.txn(Some(fx.food_id), dec!(-25)))
        .unwrap()
        .id
        .unwrap();

    let edit = TransactionEdit {
        date: Some("2024-6-1".into()),
        ..TransactionEdit::default()
    };
    let edited = journal.edit_transaction(id, &edit).unwrap().unwrap();
    assert_eq!(edited.date, "2024-06-01");
    assert_eq!(fx.db.get_transaction_by_id(id).unwrap().unwrap().date, "2024-06-01");

    let spent = fx.db.get_total_expenses(&fx.june(fx.food_id)).unwrap();
    assert_eq!(spent, dec!(25));
    assert_eq!(fx.remaining(fx.food_id), dec!(100) - spent);
}
