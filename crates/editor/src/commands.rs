//! Command execution. Every command returns the text to print.

use std::fmt::Write as _;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use valentine_client::views::{self, DraftSummary};
use valentine_client::{SwitchOutcome, ValentineClient};
use valentine_core::content::{
    BlobRef, ContentBundle, FinalDedication, GalleryItemInput, LoveMessageInput, MilestoneInput,
    Ordered, OrderedKind,
};
use valentine_core::reorder;
use valentine_core::roles::UserRole;
use valentine_core::share_link;
use valentine_core::types::Time;
use valentine_core::Version;

use crate::cli::Command;

pub async fn execute(
    client: &ValentineClient,
    command: Command,
    json: bool,
) -> anyhow::Result<String> {
    match command {
        Command::Status => {
            let panel = client.publish_panel().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&panel)?);
            }
            let mut out = format!("Version {} [{}]\n", panel.version, panel.badge);
            writeln!(out, "Last published: {}", panel.last_published)?;
            if let Some(updated) = &panel.draft_last_updated {
                writeln!(out, "Draft updated:  {updated}")?;
            }
            if panel.has_unpublished_changes {
                writeln!(out, "The draft has changes that are not published yet.")?;
            }
            write!(out, "Share link:     {}", panel.share_url)?;
            Ok(out)
        }

        Command::Checklist => {
            let steps = client.go_live_checklist().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&steps)?);
            }
            let lines: Vec<String> = steps
                .iter()
                .map(|s| {
                    let mark = if s.completed { "x" } else { " " };
                    format!("[{mark}] {}. {}: {}", s.number, s.title, s.description)
                })
                .collect();
            Ok(lines.join("\n"))
        }

        Command::Versions => {
            let active = client.active_version();
            let choices = client.version_choices().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&choices)?);
            }
            let lines: Vec<String> = choices
                .iter()
                .map(|v| {
                    let marker = if *v == active { "*" } else { " " };
                    format!("{marker} {v}")
                })
                .collect();
            Ok(lines.join("\n"))
        }

        Command::Draft => {
            let draft = client.queries().draft_content().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&draft)?);
            }
            let summary = DraftSummary::from_draft(draft.as_ref());
            Ok(format!(
                "Draft of version {}: {}\n{}",
                client.active_version(),
                summary.describe(),
                render_bundle(draft.as_ref())?
            ))
        }

        Command::Published => {
            let view = client.queries().published_view().await?;
            if json {
                return Ok(serde_json::to_string_pretty(&view.content)?);
            }
            if !view.is_published || view.content.is_none() {
                return Ok(format!(
                    "Version {} is not published yet.",
                    client.active_version()
                ));
            }
            render_bundle(view.content.as_ref())
        }

        Command::Publish => {
            let outcome = client.orchestrator().publish_draft().await?;
            let mut out = format!("Published version {}.", outcome.version);
            if !outcome.is_fully_refreshed() {
                write!(
                    out,
                    " {} view(s) could not be refreshed and may show older data.",
                    outcome.stale.len()
                )?;
            }
            write!(out, "\nShare link: {}", client.share_url()?)?;
            Ok(out)
        }

        Command::Switch { version } => {
            let version = Version::parse(&version)?;
            render_switch(client.orchestrator().switch_version(version).await?)
        }

        Command::ShareLink => Ok(client.share_url()?),

        Command::OpenLink { url } => match share_link::parse_share_url(&url)? {
            Some(version) => render_switch(client.orchestrator().switch_version(version).await?),
            None => bail!("{url} does not name a version"),
        },

        Command::AddPhoto { url, caption } => {
            let item = client
                .mutations()
                .add_gallery_item(GalleryItemInput::new(BlobRef::new(url), &caption))
                .await?;
            Ok(format!("Added photo {} at position {}.", item.id, item.order))
        }

        Command::AddMessage {
            title,
            preview,
            text,
        } => {
            let message = client
                .mutations()
                .add_love_message(LoveMessageInput::new(&title, &preview, &text))
                .await?;
            Ok(format!("Added message {} at position {}.", message.id, message.order))
        }

        Command::AddMilestone {
            date,
            title,
            description,
            photo,
        } => {
            let input = MilestoneInput::new(
                parse_date(&date)?,
                &title,
                &description,
                photo.map(BlobRef::new),
            );
            let milestone = client.mutations().add_timeline_milestone(input).await?;
            Ok(format!("Added milestone {}.", milestone.id))
        }

        Command::Delete { kind, id } => {
            let m = client.mutations();
            match OrderedKind::from(kind) {
                OrderedKind::GalleryItem => m.delete_gallery_item(&id).await?,
                OrderedKind::LoveMessage => m.delete_love_message(&id).await?,
                OrderedKind::TimelineMilestone => m.delete_timeline_milestone(&id).await?,
            }
            Ok(format!("Deleted {id}."))
        }

        Command::Move { kind, from, to } => {
            let draft = client
                .queries()
                .draft_content()
                .await?
                .context("the active version has no draft yet")?;
            let m = client.mutations();
            let updates = match OrderedKind::from(kind) {
                OrderedKind::GalleryItem => {
                    m.reorder_gallery(&moved(&draft.gallery_items, from, to)?).await?
                }
                OrderedKind::LoveMessage => {
                    m.reorder_love_messages(&moved(&draft.love_messages, from, to)?).await?
                }
                OrderedKind::TimelineMilestone => {
                    m.reorder_timeline(&moved(&draft.timeline_milestones, from, to)?).await?
                }
            };
            Ok(format!("Moved item {from} to {to} ({updates} update(s))."))
        }

        Command::SetDedication { title, message } => {
            client
                .mutations()
                .set_final_dedication(FinalDedication::new(&title, &message))
                .await?;
            Ok("Dedication saved.".to_string())
        }

        Command::Whoami => {
            let q = client.queries();
            let role = q.caller_role().await?;
            let admin = q.is_admin().await?;
            let name = if role != UserRole::Guest {
                q.caller_profile().await?.map(|p| p.name)
            } else {
                None
            };
            Ok(format!(
                "Role: {}{}\nName: {}",
                role.as_str(),
                if admin { " (admin)" } else { "" },
                name.as_deref().unwrap_or("not set")
            ))
        }

        Command::SetName { name } => {
            let profile = client.mutations().save_caller_profile(&name).await?;
            Ok(format!("Saved name {}.", profile.name))
        }
    }
}

/// The list in display order with one entry moved.
fn moved<T: Ordered + Clone>(items: &[T], from: usize, to: usize) -> anyhow::Result<Vec<T>> {
    if from >= items.len() || to >= items.len() {
        bail!("positions must be below {}", items.len());
    }
    let sorted: Vec<T> = reorder::sorted_by_order(items).into_iter().cloned().collect();
    Ok(reorder::move_item(&sorted, from, to))
}

fn parse_date(raw: &str) -> anyhow::Result<Time> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {raw:?}, expected YYYY-MM-DD"))?;
    date.and_hms_opt(0, 0, 0)
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
        .with_context(|| format!("date {raw} is out of range"))
}

fn render_switch(outcome: SwitchOutcome) -> anyhow::Result<String> {
    Ok(match outcome {
        SwitchOutcome::Unchanged => "Version unchanged.".to_string(),
        SwitchOutcome::Switched { from, to, .. } => format!("Switched from {from} to {to}."),
    })
}

fn render_bundle(bundle: Option<&ContentBundle>) -> anyhow::Result<String> {
    let mut out = String::new();

    let photos = views::gallery(bundle);
    writeln!(out, "Photos ({}):", photos.len())?;
    for (idx, p) in photos.iter().enumerate() {
        writeln!(out, "  {idx}. {} [{}]", p.caption, p.id)?;
    }

    let messages = views::love_messages(bundle);
    writeln!(out, "Messages ({}):", messages.len())?;
    for (idx, m) in messages.iter().enumerate() {
        writeln!(out, "  {idx}. {}: {} [{}]", m.title, m.preview, m.id)?;
    }

    let milestones = views::timeline(bundle);
    writeln!(out, "Timeline ({}):", milestones.len())?;
    for m in &milestones {
        let date = valentine_core::types::to_timestamp(m.date).format("%Y-%m-%d");
        writeln!(out, "  {date} {} [{}]", m.title, m.id)?;
    }

    let surprise = views::surprise(bundle);
    writeln!(
        out,
        "Surprise: {} quiz question(s), {} flip card(s)",
        surprise.quiz.as_ref().map_or(0, |q| q.total()),
        surprise.flip_cards.len()
    )?;

    match views::dedication(bundle) {
        Some(d) => write!(out, "Dedication: {}: {}", d.title, d.message)?,
        None => write!(out, "Dedication: not set")?,
    }
    Ok(out)
}
