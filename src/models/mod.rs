mod budget;
mod category;
mod notification;
mod transaction;
mod user;

pub use budget::{Budget, BudgetDraft, BudgetPatch, PeriodKey};
pub use category::Category;
pub use notification::{Notification, NotifyType};
pub use transaction::{Transaction, TransactionEdit};
pub use user::User;
