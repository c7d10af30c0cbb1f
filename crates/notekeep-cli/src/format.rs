//! Plain-text rendering of notes and categories.

use notekeep_core::models::{Category, Note};

/// Widest title shown in list rows
const MAX_TITLE_WIDTH: usize = 40;

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// One list row: id, favorite marker, title, visibility.
pub fn note_row(note: &Note) -> String {
    let marker = if note.is_favorite() { '*' } else { ' ' };
    format!(
        "{:>5} {} {:<width$}  [{}]",
        note.id,
        marker,
        truncate_string(&note.title, MAX_TITLE_WIDTH),
        note.visibility_label(),
        width = MAX_TITLE_WIDTH,
    )
}

pub fn note_detail(note: &Note) -> String {
    let mut out = format!("#{} {}\n[{}]", note.id, note.title, note.visibility_label());
    if !note.description.is_empty() {
        out.push_str("\n\n");
        out.push_str(&note.description);
    }
    out
}

pub fn category_row(category: &Category) -> String {
    format!("{:>5}   {}", category.id, category.name)
}
