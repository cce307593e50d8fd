#[derive(Debug, Clone)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub created_at: String,
}

impl User {
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            name,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
