//! Content model shared with the backend.
//!
//! Every version owns one draft [`ContentBundle`] and, once published, one
//! published bundle of the same shape. Field names follow the backend's
//! camelCase wire format.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Time;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Reference to an image held in the backend's blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobRef {
    /// Directly loadable URL for the blob.
    pub url: String,
}

impl BlobRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub image: BlobRef,
    pub caption: String,
    pub order: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoveMessage {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub full_text: String,
    pub order: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineMilestone {
    pub id: String,
    pub date: Time,
    pub title: String,
    pub description: String,
    pub photo: Option<BlobRef>,
    pub order: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub correct_answer: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlipCard {
    pub front: String,
    pub back: String,
}

/// Quiz and flip-card configuration; one per version and draft state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveSurpriseConfig {
    #[serde(default)]
    pub quiz_questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub flip_cards: Vec<FlipCard>,
}

impl InteractiveSurpriseConfig {
    /// Every question needs text, at least two options, and a correct
    /// answer that is one of its options. Flip cards need both faces.
    pub fn validate_config(&self) -> Result<(), CoreError> {
        for (idx, q) in self.quiz_questions.iter().enumerate() {
            let n = idx + 1;
            if q.question.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Quiz question {n} must not be empty"
                )));
            }
            if q.options.len() < 2 {
                return Err(CoreError::Validation(format!(
                    "Quiz question {n} needs at least 2 options, got {}",
                    q.options.len()
                )));
            }
            if !q.options.iter().any(|o| o == &q.correct_answer) {
                return Err(CoreError::Validation(format!(
                    "Quiz question {n}: correct answer '{}' is not one of its options",
                    q.correct_answer
                )));
            }
        }
        for (idx, card) in self.flip_cards.iter().enumerate() {
            if card.front.trim().is_empty() || card.back.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "Flip card {} must have both a front and a back",
                    idx + 1
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinalDedication {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
}

impl FinalDedication {
    pub fn new(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
        }
        .trimmed()
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(self) -> Self {
        Self {
            title: trim_owned(self.title),
            message: trim_owned(self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundles and status
// ---------------------------------------------------------------------------

/// All content for one version in one state (draft or published).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    #[serde(default)]
    pub gallery_items: Vec<GalleryItem>,
    #[serde(default)]
    pub love_messages: Vec<LoveMessage>,
    #[serde(default)]
    pub timeline_milestones: Vec<TimelineMilestone>,
    #[serde(default)]
    pub interactive_surprise_config: Option<InteractiveSurpriseConfig>,
    #[serde(default)]
    pub final_dedication: Option<FinalDedication>,
}

impl ContentBundle {
    pub fn is_empty(&self) -> bool {
        self.gallery_items.is_empty()
            && self.love_messages.is_empty()
            && self.timeline_milestones.is_empty()
            && self.interactive_surprise_config.is_none()
            && self.final_dedication.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    pub is_published: bool,
    #[serde(default)]
    pub last_published: Option<Time>,
    #[serde(default)]
    pub draft_last_updated: Option<Time>,
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Entities displayed in an owner-controlled order.
pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> u64;
}

impl Ordered for GalleryItem {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u64 {
        self.order
    }
}

impl Ordered for LoveMessage {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u64 {
        self.order
    }
}

impl Ordered for TimelineMilestone {
    fn id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> u64 {
        self.order
    }
}

/// The three orderable collections of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderedKind {
    GalleryItem,
    LoveMessage,
    TimelineMilestone,
}

impl OrderedKind {
    /// Prefix used when minting ids for new entities of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            OrderedKind::GalleryItem => "gallery",
            OrderedKind::LoveMessage => "message",
            OrderedKind::TimelineMilestone => "milestone",
        }
    }

    /// Mint a new, time-ordered unique id such as `gallery-0190...`.
    pub fn new_id(self) -> String {
        format!("{}-{}", self.id_prefix(), uuid::Uuid::now_v7().simple())
    }
}

// ---------------------------------------------------------------------------
// Editor inputs
// ---------------------------------------------------------------------------

/// Fields supplied by the editor when adding a gallery item.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct GalleryItemInput {
    pub image: BlobRef,
    #[validate(length(min = 1, message = "caption must not be empty"))]
    pub caption: String,
}

impl GalleryItemInput {
    pub fn new(image: BlobRef, caption: &str) -> Self {
        Self {
            image,
            caption: caption.to_string(),
        }
        .trimmed()
    }

    pub fn trimmed(self) -> Self {
        Self {
            image: self.image,
            caption: trim_owned(self.caption),
        }
    }
}

/// Fields supplied by the editor when adding or editing a love message.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LoveMessageInput {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "preview must not be empty"))]
    pub preview: String,
    #[validate(length(min = 1, message = "full text must not be empty"))]
    pub full_text: String,
}

impl LoveMessageInput {
    pub fn new(title: &str, preview: &str, full_text: &str) -> Self {
        Self {
            title: title.to_string(),
            preview: preview.to_string(),
            full_text: full_text.to_string(),
        }
        .trimmed()
    }

    pub fn trimmed(self) -> Self {
        Self {
            title: trim_owned(self.title),
            preview: trim_owned(self.preview),
            full_text: trim_owned(self.full_text),
        }
    }
}

/// Fields supplied by the editor when adding or editing a milestone.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct MilestoneInput {
    pub date: Time,
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: String,
    pub photo: Option<BlobRef>,
}

impl MilestoneInput {
    pub fn new(date: Time, title: &str, description: &str, photo: Option<BlobRef>) -> Self {
        Self {
            date,
            title: title.to_string(),
            description: description.to_string(),
            photo,
        }
        .trimmed()
    }

    pub fn trimmed(self) -> Self {
        Self {
            date: self.date,
            title: trim_owned(self.title),
            description: trim_owned(self.description),
            photo: self.photo,
        }
    }
}

fn trim_owned(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        value
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &str, options: &[&str]) -> QuizQuestion {
        QuizQuestion {
            question: "Where did we meet?".into(),
            correct_answer: correct.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn bundle_uses_camel_case_wire_names() {
        let bundle = ContentBundle {
            love_messages: vec![LoveMessage {
                id: "message-1".into(),
                title: "Hi".into(),
                preview: "p".into(),
                full_text: "full".into(),
                order: 0,
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["loveMessages"][0]["fullText"], "full");
        assert!(json["galleryItems"].as_array().unwrap().is_empty());
        assert!(json["finalDedication"].is_null());
    }

    #[test]
    fn bundle_tolerates_missing_collections() {
        let bundle: ContentBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn inputs_are_trimmed_and_blank_fields_rejected() {
        let input = LoveMessageInput::new("  Title ", " ", "text");
        assert_eq!(input.title, "Title");
        let err = CoreError::from(input.validate().unwrap_err());
        assert!(err.to_string().contains("preview"));

        let dedication = FinalDedication::new(" Forever ", " yours ");
        assert!(dedication.validate().is_ok());
        assert_eq!(dedication.message, "yours");
    }

    #[test]
    fn trimmed_normalizes_struct_literals() {
        let dedication = FinalDedication {
            title: "  ".into(),
            message: " Always\n".into(),
        }
        .trimmed();
        assert_eq!(dedication.message, "Always");
        assert!(dedication.validate().is_err());

        let milestone = MilestoneInput {
            date: 42,
            title: "\tFirst date ".into(),
            description: "Coffee".into(),
            photo: Some(BlobRef::new("https://blobs.test/a.jpg")),
        }
        .trimmed();
        assert_eq!(milestone.title, "First date");
        assert_eq!(milestone.date, 42);
        assert!(milestone.photo.is_some());
    }

    #[test]
    fn quiz_requires_correct_answer_among_options() {
        let ok = InteractiveSurpriseConfig {
            quiz_questions: vec![question("Paris", &["Paris", "Rome"])],
            flip_cards: vec![],
        };
        assert!(ok.validate_config().is_ok());

        let bad = InteractiveSurpriseConfig {
            quiz_questions: vec![question("Oslo", &["Paris", "Rome"])],
            flip_cards: vec![],
        };
        let msg = bad.validate_config().unwrap_err().to_string();
        assert!(msg.contains("Oslo"));
    }

    #[test]
    fn quiz_rejects_single_option_question() {
        let cfg = InteractiveSurpriseConfig {
            quiz_questions: vec![question("Paris", &["Paris"])],
            flip_cards: vec![],
        };
        assert!(cfg.validate_config().is_err());
    }

    #[test]
    fn flip_cards_need_both_faces() {
        let cfg = InteractiveSurpriseConfig {
            quiz_questions: vec![],
            flip_cards: vec![FlipCard {
                front: "Guess".into(),
                back: "  ".into(),
            }],
        };
        assert!(cfg.validate_config().is_err());
    }

    #[test]
    fn new_ids_carry_kind_prefix_and_are_unique() {
        let a = OrderedKind::GalleryItem.new_id();
        let b = OrderedKind::GalleryItem.new_id();
        assert!(a.starts_with("gallery-"));
        assert_ne!(a, b);
        assert!(OrderedKind::TimelineMilestone.new_id().starts_with("milestone-"));
    }
}
