use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::collections::HashMap;

use super::{flag_value, has_flag, positional};
use crate::db::Database;
use crate::engine::{BudgetEngine, BudgetStore};
use crate::journal::Journal;
use crate::models::{
    Budget, BudgetDraft, BudgetPatch, Category, PeriodKey, Transaction, TransactionEdit, User,
};
use crate::util::{format_amount, parse_amount, parse_month, truncate};

pub(crate) const DEFAULT_USER: &str = "Default";

pub(crate) fn as_cli(args: &[String], db: &Database) -> Result<()> {
    let user = resolve_user(args, db)?;
    let user_id = user
        .id
        .ok_or_else(|| anyhow::anyhow!("User has no ID"))?;
    let args = strip_user_flag(args);

    match args.get(1).map(String::as_str) {
        Some("budget") | Some("b") => cli_budget(&args[2..], db, user_id),
        Some("txn") | Some("t") => cli_txn(&args[2..], db, user_id),
        Some("notifications") | Some("n") => cli_notifications(&args[2..], db, user_id),
        Some("user") => cli_user(&args[2..], db),
        Some("users") => cli_users(db),
        Some("category") => cli_category(&args[2..], db),
        Some("categories") => cli_categories(db),
        None | Some("--help") | Some("-h") | Some("help") => {
            print_usage();
            Ok(())
        }
        Some("--version") | Some("-V") | Some("version") => {
            println!("budgetwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(other) => {
            print_usage();
            bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("budgetwatch — local-only budget tracking");
    println!();
    println!("Usage: budgetwatch [--user <name>] <command>");
    println!();
    println!("Commands:");
    println!("  budget set <category> <YYYY-MM> <limit>   Create or update a monthly budget");
    println!("    --note <text>                           Attach a note");
    println!("  budget update <id>                        Change an existing budget");
    println!("    --limit <n> --current <n> --note <t>");
    println!("  budget delete <id>                        Delete a budget");
    println!("  budget list [YYYY-MM]                     List budgets (default: all)");
    println!("  txn add <category|-> <amount>             Record a transaction (negative = expense)");
    println!("    --date <YYYY-MM-DD> --desc <text>");
    println!("  txn edit <id>                             Edit a transaction");
    println!("    --amount <n> --category <name|-> --date <d> --desc <t>");
    println!("  txn delete <id>                           Delete a transaction");
    println!("  txn list [YYYY-MM]                        List transactions");
    println!("  notifications [--unread] [--mark-read]    Show alerts");
    println!("  user add <name>                           Add a user");
    println!("  users                                     List users");
    println!("  category add <name>                       Add a category");
    println!("  categories                                List categories");
    println!("  --help, -h                                Show this help");
    println!("  --version, -V                             Show version");
}

// ── User context ──────────────────────────────────────────────

fn resolve_user(args: &[String], db: &Database) -> Result<User> {
    if let Some(name) = flag_value(args, "--user") {
        return db
            .get_user_by_name(name)?
            .ok_or_else(|| anyhow::anyhow!("User '{name}' not found"));
    }
    if let Some(user) = db.get_user_by_name(DEFAULT_USER)? {
        return Ok(user);
    }
    db.get_users()?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No users found. Add one with `budgetwatch user add <name>`"))
}

fn strip_user_flag(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--user" {
            iter.next();
            continue;
        }
        out.push(arg.clone());
    }
    out
}

// ── Budgets ───────────────────────────────────────────────────

fn cli_budget(args: &[String], db: &Database, user_id: i64) -> Result<()> {
    let engine = BudgetEngine::for_database(db);
    let pos = positional(args, &["--note", "--limit", "--current"]);

    match pos.first().copied() {
        Some("set") => {
            let [category, month, limit] = &pos[1..] else {
                bail!("Usage: budgetwatch budget set <category> <YYYY-MM> <limit> [--note <text>]");
            };
            let category = find_category(db, category)?;
            let (year, month) = parse_month(month)?;
            let key = PeriodKey::new(user_id, category_id(&category)?, year, month);
            let mut draft = BudgetDraft::new(key, parse_amount(limit)?);
            if let Some(note) = flag_value(args, "--note") {
                draft = draft.with_note(note);
            }
            let budget = engine.create_or_update_budget(draft)?;
            println!(
                "Budget set: {} = {} for {}, {} remaining",
                category.name,
                format_amount(budget.limit),
                key.month_prefix(),
                format_amount(budget.current_amount),
            );
            Ok(())
        }
        Some("update") => {
            let Some(id) = pos.get(1) else {
                bail!("Usage: budgetwatch budget update <id> [--limit <n>] [--current <n>] [--note <text>]");
            };
            let id = expand_budget_id(db, id)?;
            let patch = BudgetPatch {
                limit: flag_value(args, "--limit").map(parse_amount).transpose()?,
                current_amount: flag_value(args, "--current").map(parse_amount).transpose()?,
                note: flag_value(args, "--note").map(str::to_string),
                ..BudgetPatch::default()
            };
            if engine.update_budget(&id, &patch)? {
                println!("Budget {} updated", short_id(&id));
            } else {
                println!("No budget with id {id}");
            }
            Ok(())
        }
        Some("delete") | Some("rm") => {
            let Some(id) = pos.get(1) else {
                bail!("Usage: budgetwatch budget delete <id>");
            };
            let id = expand_budget_id(db, id)?;
            if engine.delete_budget(&id)? {
                println!("Budget {} deleted", short_id(&id));
            } else {
                println!("No budget with id {id}");
            }
            Ok(())
        }
        Some("list") | Some("ls") | None => {
            let budgets = match pos.get(1) {
                Some(month) => {
                    let (year, month) = parse_month(month)?;
                    engine.get_by_month(year, month, Some(user_id))?
                }
                None => engine.get_by_user(user_id)?,
            };
            print_budgets(db, &budgets)
        }
        Some(other) => bail!("Unknown budget command: {other}"),
    }
}

fn print_budgets(db: &Database, budgets: &[Budget]) -> Result<()> {
    if budgets.is_empty() {
        println!("No budgets");
        return Ok(());
    }
    let names = category_names(db)?;

    println!(
        "{:<9} {:<20} {:<8} {:>14} {:>14} {:>14}",
        "ID", "Category", "Month", "Limit", "Spent", "Remaining"
    );
    println!("{}", "─".repeat(84));
    for b in budgets {
        let name = names
            .get(&b.category_id)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "{:<9} {:<20} {:04}-{:02}  {:>14} {:>14} {:>14}{}",
            short_id(&b.id),
            truncate(name, 20),
            b.year,
            b.month,
            format_amount(b.limit),
            format_amount(b.spent()),
            format_amount(b.current_amount),
            if b.is_overspent() { "  OVER" } else { "" },
        );
    }
    Ok(())
}

/// Accept a unique prefix of a budget id, as printed by `budget list`.
fn expand_budget_id(db: &Database, prefix: &str) -> Result<String> {
    let matches: Vec<String> = db
        .load_all()?
        .into_iter()
        .map(|b| b.id)
        .filter(|id| id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [only] => Ok(only.clone()),
        [] => Ok(prefix.to_string()),
        _ => bail!("Budget id '{prefix}' is ambiguous"),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

// ── Transactions ──────────────────────────────────────────────

fn cli_txn(args: &[String], db: &Database, user_id: i64) -> Result<()> {
    let journal = Journal::new(db);
    let pos = positional(args, &["--date", "--desc", "--amount", "--category"]);

    match pos.first().copied() {
        Some("add") => {
            let [category, amount] = &pos[1..] else {
                bail!("Usage: budgetwatch txn add <category|-> <amount> [--date YYYY-MM-DD] [--desc <text>]");
            };
            let category_id = optional_category(db, category)?;
            let date = match flag_value(args, "--date") {
                Some(d) => validate_date(d)?,
                None => chrono::Local::now().format("%Y-%m-%d").to_string(),
            };
            let description = flag_value(args, "--desc").unwrap_or_default().to_string();
            let txn = Transaction::new(user_id, category_id, date, description, parse_amount(amount)?);
            let txn = journal.record_transaction(txn)?;
            println!(
                "Recorded #{} {} on {}",
                txn.id.unwrap_or(0),
                format_amount(txn.amount),
                txn.date
            );
            report_budget(db, &txn)
        }
        Some("edit") => {
            let Some(id) = pos.get(1) else {
                bail!("Usage: budgetwatch txn edit <id> [--amount <n>] [--category <name|->] [--date <d>] [--desc <t>]");
            };
            let id = parse_id(id)?;
            let edit = TransactionEdit {
                amount: flag_value(args, "--amount").map(parse_amount).transpose()?,
                category_id: flag_value(args, "--category")
                    .map(|c| optional_category(db, c))
                    .transpose()?,
                date: flag_value(args, "--date").map(validate_date).transpose()?,
                description: flag_value(args, "--desc").map(str::to_string),
            };
            match journal.edit_transaction(id, &edit)? {
                Some(txn) => {
                    println!("Updated #{id}");
                    report_budget(db, &txn)
                }
                None => {
                    println!("No transaction #{id}");
                    Ok(())
                }
            }
        }
        Some("delete") | Some("rm") => {
            let Some(id) = pos.get(1) else {
                bail!("Usage: budgetwatch txn delete <id>");
            };
            let id = parse_id(id)?;
            if journal.delete_transaction(id)? {
                println!("Deleted #{id}");
            } else {
                println!("No transaction #{id}");
            }
            Ok(())
        }
        Some("list") | Some("ls") | None => {
            if let Some(month) = pos.get(1) {
                parse_month(month)?;
            }
            let txns = db.get_transactions(user_id, pos.get(1).copied())?;
            if txns.is_empty() {
                println!("No transactions");
                return Ok(());
            }
            let names = category_names(db)?;
            println!(
                "{:<6} {:<10} {:<28} {:<20} {:>12}",
                "ID", "Date", "Description", "Category", "Amount"
            );
            println!("{}", "─".repeat(80));
            for t in &txns {
                let category = t
                    .category_id
                    .and_then(|id| names.get(&id))
                    .map(String::as_str)
                    .unwrap_or("-");
                println!(
                    "{:<6} {:<10} {:<28} {:<20} {:>12}",
                    t.id.unwrap_or(0),
                    t.date,
                    truncate(&t.description, 28),
                    truncate(category, 20),
                    format_amount(t.amount),
                );
            }
            Ok(())
        }
        Some(other) => bail!("Unknown txn command: {other}"),
    }
}

/// Print where the transaction's budget stands after posting.
fn report_budget(db: &Database, txn: &Transaction) -> Result<()> {
    let Some(key) = txn.period_key()? else {
        return Ok(());
    };
    if let Some(budget) = db.find_by_key(&key)? {
        if budget.is_overspent() {
            println!(
                "Over budget by {} for {}",
                format_amount(-budget.current_amount),
                key.month_prefix()
            );
        } else {
            println!(
                "{} left for {}",
                format_amount(budget.current_amount),
                key.month_prefix()
            );
        }
    }
    Ok(())
}

pub(super) fn validate_date(s: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn parse_id(s: &str) -> Result<i64> {
    s.trim_start_matches('#')
        .parse()
        .with_context(|| format!("Invalid id: {s}"))
}

// ── Notifications / users / categories ────────────────────────

fn cli_notifications(args: &[String], db: &Database, user_id: i64) -> Result<()> {
    let notes = db.get_notifications(user_id, has_flag(args, "--unread"))?;
    if notes.is_empty() {
        println!("No notifications");
    }
    for n in &notes {
        let marker = if n.is_read { ' ' } else { '*' };
        println!(
            "{marker} #{:<4} {} [{}] {}",
            n.id.unwrap_or(0),
            n.created_at.get(..10).unwrap_or(&n.created_at),
            n.notify_type,
            n.title
        );
        println!("    {}", n.content);
    }
    if has_flag(args, "--mark-read") {
        let count = db.mark_notifications_read(user_id)?;
        println!("Marked {count} as read");
    }
    Ok(())
}

fn cli_user(args: &[String], db: &Database) -> Result<()> {
    match args {
        [cmd, name] if cmd == "add" => {
            let id = db
                .insert_user(&User::new(name.clone()))
                .with_context(|| format!("Could not add user '{name}'"))?;
            println!("Added user #{id} {name}");
            Ok(())
        }
        _ => bail!("Usage: budgetwatch user add <name>"),
    }
}

fn cli_users(db: &Database) -> Result<()> {
    for user in db.get_users()? {
        println!("{:<4} {user}", user.id.unwrap_or(0));
    }
    Ok(())
}

fn cli_category(args: &[String], db: &Database) -> Result<()> {
    match args {
        [cmd, name] if cmd == "add" => {
            if db.get_category_by_name(name)?.is_some() {
                bail!("Category '{name}' already exists");
            }
            let id = db.insert_category(&Category::new(name.clone()))?;
            println!("Added category #{id} {name}");
            Ok(())
        }
        _ => bail!("Usage: budgetwatch category add <name>"),
    }
}

fn cli_categories(db: &Database) -> Result<()> {
    for cat in db.get_categories()? {
        println!("{:<4} {cat}", cat.id.unwrap_or(0));
    }
    Ok(())
}

// ── Lookups ───────────────────────────────────────────────────

fn find_category(db: &Database, name: &str) -> Result<Category> {
    db.get_category_by_name(name)?
        .ok_or_else(|| anyhow::anyhow!("Category '{name}' not found"))
}

fn category_id(category: &Category) -> Result<i64> {
    category
        .id
        .ok_or_else(|| anyhow::anyhow!("Category has no ID"))
}

/// `-` means uncategorized.
fn optional_category(db: &Database, name: &str) -> Result<Option<i64>> {
    if name == "-" {
        return Ok(None);
    }
    find_category(db, name).and_then(|c| category_id(&c)).map(Some)
}

fn category_names(db: &Database) -> Result<HashMap<i64, String>> {
    Ok(db
        .get_categories()?
        .into_iter()
        .filter_map(|c| c.id.map(|id| (id, c.name)))
        .collect())
}
