//! Catalog item data models.
//!
//! Only the fields the planner, the path templates and the NFO generator
//! consume are modelled; everything else the server sends is ignored.

use serde::{Deserialize, Serialize};

/// Item type, closed over the kinds the planner knows how to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Series,
    Season,
    Episode,
    Movie,
    BoxSet,
    Playlist,
    CollectionFolder,
    /// Any other server type, kept only for logging.
    Unsupported(String),
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Series => "Series",
            ItemKind::Season => "Season",
            ItemKind::Episode => "Episode",
            ItemKind::Movie => "Movie",
            ItemKind::BoxSet => "BoxSet",
            ItemKind::Playlist => "Playlist",
            ItemKind::CollectionFolder => "CollectionFolder",
            ItemKind::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for ItemKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Series" => ItemKind::Series,
            "Season" => ItemKind::Season,
            "Episode" => ItemKind::Episode,
            "Movie" => ItemKind::Movie,
            "BoxSet" => ItemKind::BoxSet,
            "Playlist" => ItemKind::Playlist,
            "CollectionFolder" => ItemKind::CollectionFolder,
            _ => ItemKind::Unsupported(s),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.as_str().to_string()
    }
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Unsupported(String::new())
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External provider ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProviderIds {
    pub tvdb: Option<String>,
    pub imdb: Option<String>,
    pub tv_rage: Option<String>,
    pub tmdb: Option<String>,
}

/// A catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Item {
    pub id: String,
    #[serde(rename = "Type")]
    pub kind: ItemKind,
    pub name: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub production_year: Option<i32>,
    pub index_number: Option<i32>,
    pub parent_index_number: Option<i32>,
    pub index_number_end: Option<i32>,
    pub airs_after_season_number: Option<i32>,
    pub airs_before_season_number: Option<i32>,
    pub airs_before_episode_number: Option<i32>,
    pub provider_ids: ProviderIds,
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub season_id: Option<String>,
    pub season_name: Option<String>,
    pub recursive_item_count: Option<u64>,
    pub media_sources: Vec<MediaSource>,
}

impl Item {
    /// One-line description used when announcing root items.
    pub fn describe(&self) -> String {
        let mut message = format!("{} {}", self.id, self.kind);
        for part in [&self.series_name, &self.season_name, &self.name]
            .into_iter()
            .flatten()
        {
            message.push(' ');
            message.push_str(part);
        }
        if let Some(count) = self.recursive_item_count.filter(|c| *c > 0) {
            message.push_str(&format!(" [{} items]", count));
        }
        message
    }
}

/// One downloadable rendition of an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaSource {
    pub id: String,
    pub name: Option<String>,
    pub container: Option<String>,
    pub size: Option<u64>,
    /// "Default" for the primary rendition, otherwise an alternate.
    #[serde(rename = "Type")]
    pub source_type: Option<String>,
    pub media_streams: Vec<MediaStream>,
}

impl MediaSource {
    pub fn is_default(&self) -> bool {
        self.source_type.as_deref() == Some("Default")
    }
}

/// Elementary stream type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
    Other(String),
}

impl From<String> for StreamType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Video" => StreamType::Video,
            "Audio" => StreamType::Audio,
            "Subtitle" => StreamType::Subtitle,
            _ => StreamType::Other(s),
        }
    }
}

impl From<StreamType> for String {
    fn from(t: StreamType) -> Self {
        t.to_string()
    }
}

impl Default for StreamType {
    fn default() -> Self {
        StreamType::Other(String::new())
    }
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Video => write!(f, "Video"),
            StreamType::Audio => write!(f, "Audio"),
            StreamType::Subtitle => write!(f, "Subtitle"),
            StreamType::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One elementary stream within a media source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MediaStream {
    #[serde(rename = "Type")]
    pub stream_type: StreamType,
    pub codec: Option<String>,
    pub index: i32,
    pub is_external: bool,
    pub title: Option<String>,
    pub language: Option<String>,
    pub is_default: bool,
    pub is_forced: bool,
}

/// Artwork attached to an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageInfo {
    pub image_type: String,
    pub image_index: Option<u32>,
    pub size: Option<u64>,
    /// Server-side path, used only for its extension.
    pub path: Option<String>,
}

/// Item listing as returned by the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemQueryResult {
    pub items: Vec<Item>,
}
