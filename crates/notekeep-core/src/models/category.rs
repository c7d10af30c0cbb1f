use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Body of category create requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDraft {
    pub name: String,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Category name is required".to_string());
        }
        Ok(())
    }
}

/// Body of add-note/remove-note requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryMembership {
    pub note_id: i64,
    pub category_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() {
        let json = r#"[{"id": 1, "name": "Work"}, {"id": 2, "name": "Home"}]"#;
        let categories: Vec<Category> = serde_json::from_str(json).unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].name, "Home");
    }

    #[test]
    fn test_draft_validation() {
        assert!(CategoryDraft::new("Work").validate().is_ok());
        assert!(CategoryDraft::new("").validate().is_err());
    }
}
