//! Data models for the Notes API.
//!
//! - `Note`, `NoteDraft`: personal or public text notes, with favorite priority
//! - `Category`, `CategoryDraft`: named groups of notes

pub mod category;
pub mod note;

pub use category::{Category, CategoryDraft, CategoryMembership};
pub use note::{sort_for_list, FavoriteRequest, FavoriteTarget, Note, NoteDraft};
