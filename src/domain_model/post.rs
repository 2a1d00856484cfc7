use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct CategoryId(pub i64);

/// Listing price in minor currency units.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct Price(pub u64);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Pending,
    Approved,
    Rejected,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "PENDING",
            PostStatus::Approved => "APPROVED",
            PostStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PostStatus::Pending),
            "APPROVED" => Ok(PostStatus::Approved),
            "REJECTED" => Ok(PostStatus::Rejected),
            other => Err(format!("unknown post status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Image,
    Video,
    File,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
            MediaType::File => "FILE",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            "FILE" => Ok(MediaType::File),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMedia {
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub user_id: UserId,
    pub username: String,
}

/// Draft fields for a listing before it is stored.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: AuthorRef,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub location: String,
    pub media: Vec<PostMedia>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: AuthorRef,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub location: String,
    pub status: PostStatus,
    pub rejected_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub media: Vec<PostMedia>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostError {
    #[error("title is required")]
    TitleRequired,
    #[error("price must be greater than 0")]
    PriceInvalid,
    #[error("cannot move a {from} post")]
    InvalidStateTransition { from: PostStatus },
    #[error("rejection reason is required")]
    MissingRejectionReason,
}

impl Post {
    /// Builds a listing in the only state a new listing may have: `Pending`.
    pub fn new_pending(id: PostId, draft: NewPost, now: DateTime<Utc>) -> Result<Self, PostError> {
        if draft.title.trim().is_empty() {
            return Err(PostError::TitleRequired);
        }
        if draft.price.0 == 0 {
            return Err(PostError::PriceInvalid);
        }

        let mut media = draft.media;
        media.sort_by_key(|m| m.position);

        Ok(Post {
            id,
            author: draft.author,
            category_id: draft.category_id,
            title: draft.title,
            description: draft.description,
            price: draft.price,
            location: draft.location,
            status: PostStatus::Pending,
            rejected_reason: None,
            approved_at: None,
            created_at: now,
            updated_at: now,
            media,
        })
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), PostError> {
        self.ensure_pending()?;
        self.status = PostStatus::Approved;
        self.approved_at = Some(now);
        self.rejected_reason = None;
        self.updated_at = now;
        Ok(())
    }

    /// Reason is checked before state so an empty reason never mutates anything.
    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), PostError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PostError::MissingRejectionReason);
        }
        self.ensure_pending()?;
        self.status = PostStatus::Rejected;
        self.rejected_reason = Some(reason.to_owned());
        self.approved_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// `approved_at` is set iff approved, `rejected_reason` is set iff rejected.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            PostStatus::Pending => self.approved_at.is_none() && self.rejected_reason.is_none(),
            PostStatus::Approved => self.approved_at.is_some() && self.rejected_reason.is_none(),
            PostStatus::Rejected => self.approved_at.is_none() && self.rejected_reason.is_some(),
        }
    }

    fn ensure_pending(&self) -> Result<(), PostError> {
        match self.status {
            PostStatus::Pending => Ok(()),
            from => Err(PostError::InvalidStateTransition { from }),
        }
    }
}

/// Zero-based page of a listing query.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub const MAX_SIZE: u32 = 100;

    /// Size is kept within `1..=MAX_SIZE`.
    pub fn new(page: u32, size: u32) -> Self {
        PageRequest {
            page,
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// Newest listings first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationOutcome {
    Approved,
    Rejected,
}

/// Sent to the listing author after a moderation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationEvent {
    pub post_id: PostId,
    pub recipient: AuthorRef,
    pub outcome: ModerationOutcome,
    pub reason: Option<String>,
    pub message: String,
}

impl ModerationEvent {
    pub fn for_post(post: &Post) -> Option<Self> {
        let (outcome, message) = match post.status {
            PostStatus::Pending => return None,
            PostStatus::Approved => (
                ModerationOutcome::Approved,
                format!("Listing \"{}\" was approved.", post.title),
            ),
            PostStatus::Rejected => (
                ModerationOutcome::Rejected,
                format!(
                    "Listing \"{}\" was rejected: {}",
                    post.title,
                    post.rejected_reason.as_deref().unwrap_or_default()
                ),
            ),
        };
        Some(ModerationEvent {
            post_id: post.id,
            recipient: post.author.clone(),
            outcome,
            reason: post.rejected_reason.clone(),
            message,
        })
    }
}
