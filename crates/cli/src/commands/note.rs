//! Note command - manage learning notes

use anyhow::{Context, Result, bail};
use devshare_domain::{Note, PostStore};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::args::{NoteArgs, NoteCommands};
use crate::commands::{open_store, resolve_user};
use crate::config::AppConfig;

pub async fn execute(args: NoteArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;
    let user = resolve_user(&store, &config).await?;

    match args.command {
        NoteCommands::Add {
            title,
            content,
            file,
        } => {
            let content = read_content(content, file)?;
            if content.trim().is_empty() {
                bail!("Note content is empty");
            }

            let now = OffsetDateTime::now_utc();
            let note = Note {
                id: Uuid::new_v4(),
                user_id: user.id,
                title,
                content,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            };

            store.create_note(&note).await?;
            println!("Created note {}", note.id);
        }
        NoteCommands::List { json } => {
            let notes = store.list_notes(user.id).await?;

            let mut rows = Vec::with_capacity(notes.len());
            for note in &notes {
                let post_count = store.count_posts_for_note(note.id).await?;
                rows.push(NoteRow {
                    id: note.id,
                    title: note.title.clone(),
                    post_count,
                    created_at: note
                        .created_at
                        .format(&Rfc3339)
                        .unwrap_or_else(|_| note.created_at.to_string()),
                });
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No notes yet. Create one with 'devshare note add'.");
            } else {
                for row in &rows {
                    println!(
                        "{}  {}  posts: {}  created: {}",
                        row.id, row.title, row.post_count, row.created_at
                    );
                }
            }
        }
        NoteCommands::Delete { id } => {
            let Some(_note) = store.get_note(id).await? else {
                bail!("Note not found: {}", id);
            };

            store.delete_note(id).await?;
            println!("Deleted note {}", id);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct NoteRow {
    id: Uuid,
    title: String,
    post_count: u64,
    created_at: String,
}

fn read_content(content: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (content, file) {
        (Some(content), None) => Ok(content),
        (None, Some(path)) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read note from stdin")?;
            Ok(buf)
        }
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read note file: {}", path.display())),
        (None, None) => bail!("Provide note content with --content or --file"),
        (Some(_), Some(_)) => unreachable!("clap rejects --content with --file"),
    }
}
