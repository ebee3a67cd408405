//! Post command - create, schedule, and publish posts

use anyhow::{Context, Result, bail};
use devshare_domain::{
    Post, PostStatus, PostStore, SystemClock, validate_content, validate_schedule,
    usecases::{PublishConfig, PublishOrchestrator},
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::args::{PostArgs, PostCommands};
use crate::commands::{build_publishers, open_store, resolve_user};
use crate::config::AppConfig;

pub async fn execute(args: PostArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;

    match args.command {
        PostCommands::Create {
            note,
            platform,
            content,
            schedule_at,
        } => {
            let user = resolve_user(&store, &config).await?;
            let platform = platform
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown platform: {}", platform))?;

            let Some(note) = store.get_note(note).await? else {
                bail!("Note not found: {}", note);
            };

            validate_content(platform, &content)?;

            let now = OffsetDateTime::now_utc();
            let mut post = Post::new_draft(note.id, user.id, platform, content, now);

            if let Some(at) = schedule_at {
                let at = parse_rfc3339(&at)?;
                validate_schedule(at, now)?;
                post.status = PostStatus::Scheduled;
                post.scheduled_for = Some(at);
            }

            store.create_post(&post).await?;
            println!("Created {} post {} ({})", post.platform, post.id, post.status);
        }
        PostCommands::List { note, json } => {
            let user = resolve_user(&store, &config).await?;
            let posts = store.list_posts(user.id).await?;

            let rows: Vec<PostRow> = posts
                .iter()
                .filter(|p| note.is_none_or(|id| p.note_id == id))
                .map(PostRow::from)
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if rows.is_empty() {
                println!("No posts yet. Create one with 'devshare post create'.");
            } else {
                for row in &rows {
                    println!(
                        "{}  {:<9} {:<10} scheduled: {}  {}",
                        row.id,
                        row.platform,
                        row.status,
                        row.scheduled_for.as_deref().unwrap_or("-"),
                        truncate(&row.content, 60)
                    );
                }
            }
        }
        PostCommands::Publish { id } => {
            let orchestrator = build_orchestrator(&store, &config);
            let receipt = orchestrator.publish(id).await?;
            match receipt.url {
                Some(url) => println!("Published to {}: {}", receipt.platform, url),
                None => println!("Published to {}", receipt.platform),
            }
        }
        PostCommands::Schedule { id, at } => {
            let at = parse_rfc3339(&at)?;
            validate_schedule(at, OffsetDateTime::now_utc())?;

            store.schedule_post(id, at).await?;
            println!(
                "Scheduled post {} for {}",
                id,
                at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
            );
        }
        PostCommands::MarkPublished { id } => {
            let orchestrator = build_orchestrator(&store, &config);
            orchestrator.mark_published(id).await?;
            println!("Marked post {} as published", id);
        }
    }

    Ok(())
}

fn build_orchestrator(
    store: &Arc<devshare_adapters::store::SqliteStore>,
    config: &AppConfig,
) -> PublishOrchestrator<devshare_adapters::store::SqliteStore, SystemClock> {
    PublishOrchestrator::new(
        Arc::clone(store),
        Arc::new(SystemClock),
        build_publishers(config),
        PublishConfig {
            max_retries: config.scheduler.max_retries,
            retry_delay: Duration::from_secs(config.scheduler.retry_delay_secs),
        },
    )
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .with_context(|| format!("Invalid RFC 3339 timestamp: {}", value))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

#[derive(Debug, Serialize)]
struct PostRow {
    id: Uuid,
    platform: String,
    status: String,
    content: String,
    scheduled_for: Option<String>,
    published_at: Option<String>,
    external_url: Option<String>,
}

impl From<&Post> for PostRow {
    fn from(post: &Post) -> Self {
        let fmt = |t: OffsetDateTime| t.format(&Rfc3339).unwrap_or_else(|_| t.to_string());
        Self {
            id: post.id,
            platform: post.platform.to_string(),
            status: post.status.to_string(),
            content: post.content.clone(),
            scheduled_for: post.scheduled_for.map(fmt),
            published_at: post.published_at.map(fmt),
            external_url: post.external_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_preserves_short_strings() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_cuts_long_strings() {
        assert_eq!(truncate("hello world", 5), "hello...");
    }
}
