//! Shared test fixtures: an in-memory catalog and item builders.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use jellyfetch::models::item::{ImageInfo, Item, ItemKind, MediaSource, MediaStream, StreamType};
use jellyfetch::services::catalog::{ByteStream, Catalog};
use jellyfetch::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory catalog.
///
/// Streams are keyed `media:{source}`, `subtitle:{item}:{index}` and
/// `image:{item}:{type}`.
#[derive(Default)]
pub struct MockCatalog {
    pub items: HashMap<String, Item>,
    pub children: HashMap<String, Vec<String>>,
    pub images: HashMap<String, Vec<ImageInfo>>,
    pub streams: HashMap<String, Vec<u8>>,
    /// Streams that send their bytes and then fail.
    pub broken: HashSet<String>,
    /// Streams that never end.
    pub stalled: HashSet<String>,
    /// Streams that wait before opening.
    pub delays: HashMap<String, Duration>,
    pub item_fetches: AtomicUsize,
    pub opened: Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    /// Register `child` under `parent` (collection children, seasons, episodes).
    pub fn with_child(mut self, parent: &str, child: Item) -> Self {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(child.id.clone());
        self.with_item(child)
    }

    pub fn with_stream(mut self, key: &str, data: &[u8]) -> Self {
        self.streams.insert(key.to_string(), data.to_vec());
        self
    }

    pub fn with_broken_stream(mut self, key: &str, data: &[u8]) -> Self {
        self.broken.insert(key.to_string());
        self.with_stream(key, data)
    }

    pub fn with_delayed_stream(mut self, key: &str, data: &[u8], delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self.with_stream(key, data)
    }

    pub fn with_stalled_stream(mut self, key: &str) -> Self {
        self.stalled.insert(key.to_string());
        self
    }

    pub fn with_images(mut self, item_id: &str, images: Vec<ImageInfo>) -> Self {
        self.images.insert(item_id.to_string(), images);
        self
    }

    pub fn fetches(&self) -> usize {
        self.item_fetches.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    fn children_of(&self, parent: &str) -> Vec<Item> {
        self.children
            .get(parent)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    async fn open(&self, key: String) -> Result<ByteStream> {
        self.opened.lock().unwrap().push(key.clone());
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.stalled.contains(&key) {
            return Ok(futures::stream::pending::<Result<Bytes>>().boxed());
        }
        let data = self
            .streams
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        let mut chunks: Vec<Result<Bytes>> = data
            .chunks(4)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if self.broken.contains(&key) {
            chunks.push(Err(Error::transfer(key, "connection reset")));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn get_item(&self, id: &str) -> Result<Item> {
        self.item_fetches.fetch_add(1, Ordering::SeqCst);
        self.items
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn get_item_children(&self, parent_id: &str) -> Result<Vec<Item>> {
        Ok(self.children_of(parent_id))
    }

    async fn get_seasons(&self, series_id: &str) -> Result<Vec<Item>> {
        Ok(self.children_of(series_id))
    }

    async fn get_episodes(&self, _series_id: &str, season_id: &str) -> Result<Vec<Item>> {
        Ok(self.children_of(season_id))
    }

    async fn get_item_images(&self, item_id: &str) -> Result<Vec<ImageInfo>> {
        Ok(self.images.get(item_id).cloned().unwrap_or_default())
    }

    async fn open_media(&self, media_source_id: &str) -> Result<ByteStream> {
        self.open(format!("media:{}", media_source_id)).await
    }

    async fn open_subtitle(
        &self,
        item_id: &str,
        _media_source_id: &str,
        stream_index: i32,
        _format: &str,
    ) -> Result<ByteStream> {
        self.open(format!("subtitle:{}:{}", item_id, stream_index)).await
    }

    async fn open_image(
        &self,
        item_id: &str,
        image_type: &str,
        _image_index: Option<u32>,
    ) -> Result<ByteStream> {
        self.open(format!("image:{}:{}", item_id, image_type)).await
    }
}

pub fn subtitle(index: i32, codec: &str, language: &str) -> MediaStream {
    MediaStream {
        stream_type: StreamType::Subtitle,
        codec: Some(codec.to_string()),
        index,
        is_external: true,
        language: Some(language.to_string()),
        ..Default::default()
    }
}

pub fn source(id: &str, name: &str, size: Option<u64>, streams: Vec<MediaStream>) -> MediaSource {
    MediaSource {
        id: id.to_string(),
        name: Some(name.to_string()),
        container: Some("mkv".to_string()),
        size,
        source_type: Some("Default".to_string()),
        media_streams: streams,
    }
}

/// Movie `M (2020)` with one 1e9-byte source, an srt and an unsupported ass track.
pub fn movie() -> Item {
    Item {
        id: "m".to_string(),
        kind: ItemKind::Movie,
        name: Some("M".to_string()),
        production_year: Some(2020),
        media_sources: vec![source(
            "m-src",
            "M",
            Some(1_000_000_000),
            vec![subtitle(2, "srt", "eng"), subtitle(3, "ass", "fre")],
        )],
        ..Default::default()
    }
}

pub fn series(id: &str, name: &str, year: i32) -> Item {
    Item {
        id: id.to_string(),
        kind: ItemKind::Series,
        name: Some(name.to_string()),
        production_year: Some(year),
        ..Default::default()
    }
}

pub fn season(id: &str, series_id: &str, number: i32) -> Item {
    Item {
        id: id.to_string(),
        kind: ItemKind::Season,
        name: Some(format!("Season {}", number)),
        index_number: Some(number),
        series_id: Some(series_id.to_string()),
        ..Default::default()
    }
}

pub fn episode(id: &str, series_id: &str, season_id: &str, name: &str) -> Item {
    Item {
        id: id.to_string(),
        kind: ItemKind::Episode,
        name: Some(name.to_string()),
        index_number: Some(1),
        parent_index_number: Some(1),
        series_id: Some(series_id.to_string()),
        season_id: Some(season_id.to_string()),
        media_sources: vec![source(&format!("{}-src", id), name, Some(100), vec![])],
        ..Default::default()
    }
}

/// `Show: Pilot (2001)` with one season of two episodes.
pub fn show() -> MockCatalog {
    MockCatalog::new()
        .with_item(series("show", "Show: Pilot", 2001))
        .with_child("show", season("s1", "show", 1))
        .with_child("s1", episode("e1", "show", "s1", "Show S01E01"))
        .with_child("s1", episode("e2", "show", "s1", "Show S01E02"))
}
