//! The unified content entity shared by articles and events.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Event,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Event => "event",
        }
    }
}

impl TryFrom<&str> for ContentKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "article" => Ok(ContentKind::Article),
            "event" => Ok(ContentKind::Event),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Published,
    /// Default for records whose status cannot be determined, so that
    /// forward-compatible snapshot rows never leak into public views.
    #[default]
    Draft,
    Unpublished,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Published => "published",
            ContentStatus::Draft => "draft",
            ContentStatus::Unpublished => "unpublished",
        }
    }
}

impl TryFrom<&str> for ContentStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "published" => Ok(ContentStatus::Published),
            "draft" => Ok(ContentStatus::Draft),
            "unpublished" => Ok(ContentStatus::Unpublished),
            _ => Err(()),
        }
    }
}

/// Featured/trending placement per surface. Independent booleans, not
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementFlags {
    pub home_featured: bool,
    pub city_a_featured: bool,
    pub city_b_featured: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub event_end_date: Option<OffsetDateTime>,
    pub organizer: String,
    pub organizer_contact: String,
    pub venue_address: String,
    pub ticket_url: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

/// Canonical record for a single piece of content.
///
/// The snapshot store keeps a bounded-size projection of this; the primary
/// data source is authoritative and keeps fields unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub location: String,
    pub image_url: String,
    pub status: ContentStatus,
    pub placement: PlacementFlags,
    pub event: Option<EventDetails>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }

    /// Loose recall-favoring match: the item matches when ANY of its
    /// categories/location/title contains ANY of the supplied keywords,
    /// case-insensitively.
    pub fn matches_keywords(&self, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return false;
        }

        let title = self.title.to_lowercase();
        let location = self.location.to_lowercase();
        let categories: Vec<String> = self
            .categories
            .iter()
            .map(|category| category.to_lowercase())
            .collect();

        keywords.iter().any(|keyword| {
            let keyword = keyword.to_lowercase();
            if keyword.is_empty() {
                return false;
            }
            title.contains(&keyword)
                || location.contains(&keyword)
                || categories.iter().any(|category| category.contains(&keyword))
        })
    }
}
