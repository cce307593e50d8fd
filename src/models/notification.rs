#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyType {
    BudgetAlert,
    System,
}

impl NotifyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetAlert => "budget_alert",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "budget_alert" | "budget" => Self::BudgetAlert,
            _ => Self::System,
        }
    }
}

impl std::fmt::Display for NotifyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub notify_type: NotifyType,
    pub is_read: bool,
    pub created_at: String,
}
