use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Priority sent when marking a note as favorite
pub const DEFAULT_FAVORITE_PRIORITY: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    /// Favorite priority; `None` when the note is not a favorite.
    /// Only present in list responses.
    #[serde(default)]
    pub priority: Option<i64>,
}

impl Note {
    pub fn is_favorite(&self) -> bool {
        self.priority.is_some()
    }

    pub fn visibility_label(&self) -> &'static str {
        if self.is_public {
            "Public"
        } else {
            "Personal"
        }
    }

    /// Editable fields of this note, for updates.
    pub fn to_draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
        }
    }
}

/// Body of note create/update requests.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
    pub is_public: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            is_public: false,
        }
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Returns a user-facing message when the draft cannot be sent.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err("Title and description are required".to_string());
        }
        Ok(())
    }
}

/// Order notes for display: favorites first by descending priority, then
/// the rest alphabetically by title.
pub fn sort_for_list(notes: &mut [Note]) {
    notes.sort_by(|a, b| match (a.priority, b.priority) {
        (Some(pa), Some(pb)) => pb.cmp(&pa),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title.cmp(&b.title),
    });
}

/// Body of favorite add/remove requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteRequest {
    pub note_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl FavoriteRequest {
    pub fn add(note_id: i64) -> Self {
        Self {
            note_id,
            priority: Some(DEFAULT_FAVORITE_PRIORITY),
        }
    }

    pub fn remove(note_id: i64) -> Self {
        Self {
            note_id,
            priority: None,
        }
    }
}

/// Resulting favorite state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteTarget {
    Added,
    Removed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_list_entry() {
        let json = r#"{"id": 5, "title": "Groceries", "description": "milk", "is_public": true, "priority": null}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, 5);
        assert!(!note.is_favorite());
        assert_eq!(note.visibility_label(), "Public");

        let json = r#"{"id": 6, "title": "Ideas", "description": "", "is_public": false, "priority": 1}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert!(note.is_favorite());
        assert_eq!(note.visibility_label(), "Personal");
    }

    #[test]
    fn test_parse_note_detail_without_priority() {
        let json = r#"{"id": 7, "title": "Detail", "description": "body", "is_public": false, "user_id": 3}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.priority, None);
        assert_eq!(note.to_draft(), NoteDraft::new("Detail", "body"));
    }

    #[test]
    fn test_draft_validation() {
        assert!(NoteDraft::new("Groceries", "milk").validate().is_ok());
        assert!(NoteDraft::new("Groceries", "").validate().is_err());
        assert!(NoteDraft::new("Groceries", "  ").validate().is_err());
        assert!(NoteDraft::new("   ", "text").validate().is_err());
    }

    fn note(id: i64, title: &str, priority: Option<i64>) -> Note {
        Note {
            id,
            title: title.to_string(),
            description: "body".to_string(),
            is_public: false,
            priority,
        }
    }

    #[test]
    fn test_sort_for_list_puts_favorites_first() {
        let mut notes = vec![
            note(1, "Zebra", None),
            note(2, "Low", Some(1)),
            note(3, "Apple", None),
            note(4, "High", Some(5)),
            note(5, "Mango", None),
        ];
        sort_for_list(&mut notes);

        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 5, 1]);
    }

    #[test]
    fn test_favorite_request_bodies() {
        let add = serde_json::to_value(FavoriteRequest::add(5)).unwrap();
        assert_eq!(add, serde_json::json!({"note_id": 5, "priority": 1}));

        let remove = serde_json::to_value(FavoriteRequest::remove(5)).unwrap();
        assert_eq!(remove, serde_json::json!({"note_id": 5}));
    }
}
