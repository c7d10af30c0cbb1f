//! Command handlers. Each one opens its screen's route, then talks to the
//! Notes API with the session token.

use std::io::{self, Write};

use anyhow::{Context, Result};

use notekeep_core::models::{sort_for_list, FavoriteTarget, NoteDraft};
use notekeep_core::routing::Route;
use notekeep_core::ApiError;

use crate::app::App;
use crate::format::{category_row, note_detail, note_row};
use crate::{CategoriesCommand, Command, NotesCommand};

pub async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let email = match email.or_else(|| app.config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")?,
            };
            let username = app.login(&email, &password).await?;
            println!("Logged in as {}", username);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")?,
            };
            let username = app.register(&username, &email, &password).await?;
            println!("Account created. Logged in as {}", username);
        }
        Command::Logout => match app.logout().await? {
            Some(username) => println!("Logged out {}", username),
            None => println!("Not logged in"),
        },
        Command::Whoami => {
            let snapshot = app.snapshot().await;
            match snapshot.username {
                Some(username) => println!("{}", username),
                None => println!("Not logged in"),
            }
        }
        Command::Notes { action } => run_notes(app, action).await?,
        Command::Favorites => {
            let api = app.open(Route::Favorites).await?;
            let favorites = api.list_favorites().await?;
            if favorites.is_empty() {
                println!("No favorites yet");
            }
            for note in &favorites {
                println!("{}", note_row(note));
            }
        }
        Command::Categories { action } => run_categories(app, action).await?,
    }
    Ok(())
}

async fn run_notes(app: &App, action: NotesCommand) -> Result<()> {
    match action {
        NotesCommand::List => {
            let api = app.open(Route::Notes).await?;
            let mut notes = api.list_notes().await?;
            if notes.is_empty() {
                println!("No notes yet");
            }
            sort_for_list(&mut notes);
            for note in &notes {
                println!("{}", note_row(note));
            }
        }
        NotesCommand::Show { id } => {
            let api = app.open(Route::Note(id)).await?;
            let note = api.get_note(id).await?;
            println!("{}", note_detail(&note));
        }
        NotesCommand::Create {
            title,
            description,
            public,
        } => {
            let api = app.open(Route::NoteCreate).await?;
            let draft = NoteDraft::new(title, description).public(public);
            match api.create_note(&draft).await? {
                Some(note) => println!("Created note #{}", note.id),
                None => println!("Note created"),
            }
        }
        NotesCommand::Edit {
            id,
            title,
            description,
            public,
        } => {
            let api = app.open(Route::Note(id)).await?;
            let mut draft = api.get_note(id).await?.to_draft();
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(public) = public {
                draft.is_public = public;
            }
            api.update_note(id, &draft).await?;
            println!("Updated note #{}", id);
        }
        NotesCommand::Delete { id } => {
            let api = app.open(Route::Note(id)).await?;
            api.delete_note(id).await?;
            println!("Deleted note #{}", id);
        }
        NotesCommand::Favorite { id } => {
            let api = app.open(Route::Notes).await?;
            // Favorite state is only reported by the list endpoint
            let note = api
                .list_notes()
                .await?
                .into_iter()
                .find(|n| n.id == id)
                .with_context(|| format!("Note #{} not found", id))?;
            match api.toggle_favorite(&note).await? {
                FavoriteTarget::Added => println!("Added note #{} to favorites", id),
                FavoriteTarget::Removed => println!("Removed note #{} from favorites", id),
            }
        }
    }
    Ok(())
}

async fn run_categories(app: &App, action: CategoriesCommand) -> Result<()> {
    match action {
        CategoriesCommand::List => {
            let api = app.open(Route::Categories).await?;
            let categories = api.list_categories().await?;
            if categories.is_empty() {
                println!("No categories yet");
            }
            for category in &categories {
                println!("{}", category_row(category));
            }
        }
        CategoriesCommand::Create { name } => {
            let api = app.open(Route::CategoryCreate).await?;
            match api.create_category(&name).await? {
                Some(category) => println!("Created category #{}", category.id),
                None => println!("Category created"),
            }
        }
        CategoriesCommand::Delete { id } => {
            let api = app.open(Route::Categories).await?;
            api.delete_category(id).await?;
            println!("Deleted category #{}", id);
        }
        CategoriesCommand::Show { id } => {
            let api = app.open(Route::Category(id)).await?;
            let notes = api.category_notes(id).await?;
            if notes.is_empty() {
                println!("No notes in this category");
            }
            for note in &notes {
                println!("{}", note_row(note));
            }
        }
        CategoriesCommand::AddNote {
            category_id,
            note_id,
        } => {
            let api = app.open(Route::Category(category_id)).await?;
            api.add_note_to_category(note_id, category_id).await?;
            println!("Added note #{} to category #{}", note_id, category_id);
        }
        CategoriesCommand::RemoveNote {
            category_id,
            note_id,
        } => {
            let api = app.open(Route::Category(category_id)).await?;
            api.remove_note_from_category(note_id, category_id).await?;
            println!("Removed note #{} from category #{}", note_id, category_id);
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Friendly text for a failed command.
pub fn user_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized) => {
            "The server rejected your session. Run `notekeep login` again.".to_string()
        }
        Some(ApiError::NetworkError(e)) if e.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::NetworkError(_)) => {
            "Unable to connect to the server. Check the API URL and your connection.".to_string()
        }
        Some(ApiError::Validation(msg)) => msg.clone(),
        _ => format!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_api_errors() {
        let err: anyhow::Error = ApiError::Unauthorized.into();
        assert!(user_message(&err).contains("notekeep login"));

        let err: anyhow::Error = ApiError::Validation("Title is required".to_string()).into();
        assert_eq!(user_message(&err), "Title is required");
    }

    #[test]
    fn test_notes_create_requires_description() {
        use clap::Parser;

        assert!(crate::Cli::try_parse_from(["notekeep", "notes", "create", "Groceries"]).is_err());

        let cli = crate::Cli::try_parse_from(["notekeep", "notes", "create", "Groceries", "-d", "milk"])
            .unwrap();
        match cli.command {
            Command::Notes {
                action: NotesCommand::Create { title, description, public },
            } => {
                assert_eq!(title, "Groceries");
                assert_eq!(description, "milk");
                assert!(!public);
            }
            _ => panic!("expected notes create"),
        }
    }

    #[test]
    fn test_user_message_keeps_context_chain() {
        let err = anyhow::anyhow!("disk full").context("Failed to save");
        assert_eq!(user_message(&err), "Failed to save: disk full");
    }
}
