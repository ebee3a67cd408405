//! Generate command - produce platform drafts from a note

use anyhow::{Result, bail};
use devshare_domain::{Post, PostStore, usecases::GenerateDrafts};
use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::args::GenerateArgs;
use crate::commands::{build_generator, open_store, parse_platforms, resolve_user};
use crate::config::AppConfig;

pub async fn execute(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;
    let user = resolve_user(&store, &config).await?;

    let Some(note) = store.get_note(args.note).await? else {
        bail!("Note not found: {}", args.note);
    };

    let platforms = parse_platforms(&args.platforms)?;
    let generator = build_generator(&config)?;
    let usecase = GenerateDrafts::new(generator);

    tracing::info!(
        note_id = %note.id,
        platforms = ?platforms,
        provider = %config.generator.provider,
        "Generating drafts"
    );

    let results = usecase.generate_all(&note.content, &platforms).await;

    let mut rows = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (platform, result) in results {
        match result {
            Ok(draft) => {
                let saved_id = if args.save {
                    let now = OffsetDateTime::now_utc();
                    let post =
                        Post::new_draft(note.id, user.id, platform, draft.content.clone(), now);
                    store.create_post(&post).await?;
                    Some(post.id)
                } else {
                    None
                };

                rows.push(DraftRow {
                    platform: platform.to_string(),
                    content: draft.content,
                    hashtags: draft.hashtags,
                    saved_post_id: saved_id,
                    error: None,
                });
            }
            Err(error) => {
                failed += 1;
                rows.push(DraftRow {
                    platform: platform.to_string(),
                    content: String::new(),
                    hashtags: vec![],
                    saved_post_id: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("== {} ==", row.platform);
            match &row.error {
                Some(error) => println!("error: {}", error),
                None => {
                    println!("{}", row.content);
                    if !row.hashtags.is_empty() {
                        println!("{}", row.hashtags.join(" "));
                    }
                    if let Some(id) = row.saved_post_id {
                        println!("saved as draft post {}", id);
                    }
                }
            }
            println!();
        }
    }

    if failed == rows.len() && !rows.is_empty() {
        bail!("Draft generation failed for every platform");
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct DraftRow {
    platform: String,
    content: String,
    hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_post_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}
