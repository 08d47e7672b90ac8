//! Command-line definitions for the content editor.

use clap::{Parser, Subcommand, ValueEnum};
use valentine_core::content::OrderedKind;

#[derive(Debug, Parser)]
#[command(
    name = "valentine-editor",
    version,
    about = "Edit, publish, and share versions of the Valentine site"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Use a throwaway in-process backend seeded with sample content.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish status, timestamps, and share link of the active version.
    Status,
    /// Steps left before the site is live.
    Checklist,
    /// Versions available in the switcher.
    Versions,
    /// Draft content of the active version.
    Draft,
    /// What visitors currently see for the active version.
    Published,
    /// Publish the active version's draft.
    Publish,
    /// Make another version active.
    Switch {
        /// Version label, e.g. `7` or `valentine-2025`.
        version: String,
    },
    /// Print the share link of the active version.
    ShareLink,
    /// Activate the version named by a share link.
    OpenLink {
        /// Full share link, e.g. `http://localhost:5173/?v=8`.
        url: String,
    },
    /// Add a photo to the draft gallery.
    AddPhoto {
        /// Blob URL of the uploaded image.
        #[arg(long)]
        url: String,
        #[arg(long)]
        caption: String,
    },
    /// Add a love message to the draft.
    AddMessage {
        #[arg(long)]
        title: String,
        #[arg(long)]
        preview: String,
        #[arg(long)]
        text: String,
    },
    /// Add a timeline milestone to the draft.
    AddMilestone {
        /// Calendar date, `YYYY-MM-DD`.
        #[arg(long)]
        date: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Optional blob URL of a photo.
        #[arg(long)]
        photo: Option<String>,
    },
    /// Delete an item from the draft.
    Delete {
        #[arg(value_enum)]
        kind: ItemKind,
        id: String,
    },
    /// Move an item to a new position, renumbering the list.
    Move {
        #[arg(value_enum)]
        kind: ItemKind,
        /// Current position (0-based, display order).
        from: usize,
        /// Target position (0-based).
        to: usize,
    },
    /// Set the final dedication.
    SetDedication {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
    },
    /// Caller role, admin flag, and profile.
    Whoami,
    /// Save the caller's display name.
    SetName { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ItemKind {
    Photo,
    Message,
    Milestone,
}

impl From<ItemKind> for OrderedKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Photo => OrderedKind::GalleryItem,
            ItemKind::Message => OrderedKind::LoveMessage,
            ItemKind::Milestone => OrderedKind::TimelineMilestone,
        }
    }
}
