//! Framework-free view models for the site's pages and editor panels.
//!
//! Each function turns already-fetched data into exactly what a page
//! renders, so the ordering and labelling rules live in one place.

use serde::Serialize;
use valentine_core::content::{
    ContentBundle, FinalDedication, FlipCard, GalleryItem, LoveMessage, PublishStatus,
    TimelineMilestone,
};
use valentine_core::quiz::QuizSession;
use valentine_core::reorder;
use valentine_core::types::{self, Time};
use valentine_core::Version;

const BADGE_LIVE: &str = "Live";
const BADGE_NOT_PUBLISHED: &str = "Not published yet";
const NEVER: &str = "Never";

/// Render a backend timestamp like `Feb 14, 2025, 7:30 PM` (UTC).
pub fn format_time(time: Option<Time>) -> String {
    match time {
        Some(t) if t > 0 => types::to_timestamp(t)
            .format("%b %-d, %Y, %-I:%M %p")
            .to_string(),
        _ => NEVER.to_string(),
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ---------------------------------------------------------------------------
// Visitor pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    pub dedication: Option<FinalDedication>,
    pub photo_count: usize,
    pub message_count: usize,
    pub milestone_count: usize,
    pub has_surprise: bool,
}

pub fn home(bundle: Option<&ContentBundle>) -> HomeView {
    let Some(bundle) = bundle else {
        return HomeView {
            dedication: None,
            photo_count: 0,
            message_count: 0,
            milestone_count: 0,
            has_surprise: false,
        };
    };
    HomeView {
        dedication: bundle.final_dedication.clone(),
        photo_count: bundle.gallery_items.len(),
        message_count: bundle.love_messages.len(),
        milestone_count: bundle.timeline_milestones.len(),
        has_surprise: bundle
            .interactive_surprise_config
            .as_ref()
            .is_some_and(|c| !c.quiz_questions.is_empty() || !c.flip_cards.is_empty()),
    }
}

/// Gallery photos in display order.
pub fn gallery(bundle: Option<&ContentBundle>) -> Vec<GalleryItem> {
    bundle
        .map(|b| reorder::sorted_by_order(&b.gallery_items).into_iter().cloned().collect())
        .unwrap_or_default()
}

/// Love messages in display order.
pub fn love_messages(bundle: Option<&ContentBundle>) -> Vec<LoveMessage> {
    bundle
        .map(|b| reorder::sorted_by_order(&b.love_messages).into_iter().cloned().collect())
        .unwrap_or_default()
}

/// Milestones by date; same-day milestones keep their manual order.
pub fn timeline(bundle: Option<&ContentBundle>) -> Vec<TimelineMilestone> {
    let mut milestones = bundle
        .map(|b| b.timeline_milestones.clone())
        .unwrap_or_default();
    milestones.sort_by_key(|m| (m.date, m.order));
    milestones
}

#[derive(Debug, Clone)]
pub struct SurpriseView {
    /// A fresh quiz, or `None` when no questions are configured.
    pub quiz: Option<QuizSession>,
    pub flip_cards: Vec<FlipCard>,
}

pub fn surprise(bundle: Option<&ContentBundle>) -> SurpriseView {
    let config = bundle.and_then(|b| b.interactive_surprise_config.clone());
    let (questions, flip_cards) = config
        .map(|c| (c.quiz_questions, c.flip_cards))
        .unwrap_or_default();
    SurpriseView {
        quiz: (!questions.is_empty()).then(|| QuizSession::new(questions)),
        flip_cards,
    }
}

pub fn dedication(bundle: Option<&ContentBundle>) -> Option<FinalDedication> {
    bundle.and_then(|b| b.final_dedication.clone())
}

// ---------------------------------------------------------------------------
// Editor panels
// ---------------------------------------------------------------------------

/// Draft review counts shown above the editor tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DraftSummary {
    pub photo_count: usize,
    pub message_count: usize,
}

impl DraftSummary {
    pub fn from_draft(draft: Option<&ContentBundle>) -> Self {
        Self {
            photo_count: draft.map_or(0, |d| d.gallery_items.len()),
            message_count: draft.map_or(0, |d| d.love_messages.len()),
        }
    }

    /// e.g. `"3 photos, 1 message"`.
    pub fn describe(&self) -> String {
        format!(
            "{}, {}",
            plural(self.photo_count, "photo"),
            plural(self.message_count, "message")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishPanel {
    pub version: Version,
    pub is_published: bool,
    /// `"Live"` or `"Not published yet"`.
    pub badge: &'static str,
    pub last_published: String,
    /// Only shown once the draft has been edited.
    pub draft_last_updated: Option<String>,
    /// The draft changed after the last publish.
    pub has_unpublished_changes: bool,
    pub share_url: String,
}

impl PublishPanel {
    pub fn new(version: Version, status: &PublishStatus, share_url: String) -> Self {
        let has_unpublished_changes = match (status.draft_last_updated, status.last_published) {
            (Some(updated), Some(published)) => updated > published,
            (Some(_), None) => true,
            _ => false,
        };
        Self {
            version,
            is_published: status.is_published,
            badge: if status.is_published {
                BADGE_LIVE
            } else {
                BADGE_NOT_PUBLISHED
            },
            last_published: format_time(status.last_published),
            draft_last_updated: status.draft_last_updated.map(|t| format_time(Some(t))),
            has_unpublished_changes,
            share_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoLiveStep {
    pub number: u8,
    pub title: &'static str,
    pub description: String,
    pub completed: bool,
}

/// The three steps from a draft to a shared, visible site.
pub fn go_live_checklist(status: &PublishStatus, share_url: &str) -> Vec<GoLiveStep> {
    vec![
        GoLiveStep {
            number: 1,
            title: "Create Your Content",
            description: "Add photos, messages, timeline events, and more.".into(),
            completed: true,
        },
        GoLiveStep {
            number: 2,
            title: "Publish Your Changes",
            description: "Publish to make your content visible to visitors.".into(),
            completed: status.is_published,
        },
        GoLiveStep {
            number: 3,
            title: "Share Your Link",
            description: format!("Copy and share your unique link: {share_url}"),
            completed: status.is_published,
        },
    ]
}

/// Versions offered by the switcher: every published one plus the
/// active one, sorted and without duplicates.
pub fn version_choices(published: &[Version], active: &Version) -> Vec<Version> {
    let mut choices: Vec<Version> = published.to_vec();
    choices.push(active.clone());
    choices.sort();
    choices.dedup();
    choices
}
