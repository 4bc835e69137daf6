//! Plan generation module.
//!
//! Walks the catalog hierarchy from one or more root items and produces
//! task trees, depth-first with every container emitted before its
//! children:
//! 1. Series: `tvshow.nfo` node, then each season
//! 2. Season: `season.nfo` node, then each episode
//! 3. Collections: empty node, then each child item
//! 4. Movies and episodes: one tree per media source (media + NFO +
//!    external subtitles + artwork)
//!
//! Trees are sent through a channel as soon as they are built, so callers
//! can start reconciling while the rest of the library is still being
//! listed. A child that cannot be planned is reported on the same channel
//! and its siblings carry on.

use crate::core::cache::ItemCache;
use crate::generators::{naming, nfo};
use crate::models::config::NamingConfig;
use crate::models::item::{Item, ItemKind, MediaSource, MediaStream, StreamType};
use crate::models::task::{FetchKind, FetchTask, StreamRequest};
use crate::services::catalog::Catalog;
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffered trees between the planner and its consumer.
const PLAN_CHANNEL_CAPACITY: usize = 64;

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Path templates.
    pub naming: NamingConfig,
    /// Whether to query artwork for each item.
    pub with_images: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            naming: NamingConfig::default(),
            with_images: true,
        }
    }
}

/// An item that could not be planned.
#[derive(Debug)]
pub struct PlanFailure {
    /// Root id or child item id.
    pub item: String,
    pub error: Error,
}

/// Sent by the planner, in emission order.
#[derive(Debug)]
pub enum PlanEvent {
    Task(FetchTask),
    Failed(PlanFailure),
}

/// Result of planning a set of roots.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    /// Root items that resolved.
    pub roots: Vec<Arc<Item>>,
    /// Task trees in emission order.
    pub tasks: Vec<FetchTask>,
    /// Roots and children that failed, with the error that stopped them.
    pub failures: Vec<PlanFailure>,
}

/// Plan generator.
pub struct Planner {
    catalog: Arc<dyn Catalog>,
    cache: ItemCache,
    config: PlannerConfig,
}

impl Planner {
    /// Create a new planner with default configuration.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::with_config(catalog, PlannerConfig::default())
    }

    /// Create a new planner with custom configuration.
    pub fn with_config(catalog: Arc<dyn Catalog>, config: PlannerConfig) -> Self {
        Self {
            catalog,
            cache: ItemCache::new(),
            config,
        }
    }

    /// Fetch a root item through the run cache.
    pub async fn resolve(&self, id: &str) -> Result<Arc<Item>> {
        self.cache.get_or_fetch(self.catalog.as_ref(), id).await
    }

    /// Plan every root and collect the trees.
    ///
    /// `on_task` sees each tree as soon as it is planned. A failing root or
    /// child is recorded and does not stop its siblings.
    pub async fn collect<F>(&self, roots: &[String], shallow: bool, mut on_task: F) -> PlanOutcome
    where
        F: FnMut(&FetchTask),
    {
        let (tx, mut rx) = mpsc::channel(PLAN_CHANNEL_CAPACITY);

        let producer = async move {
            let result = self.plan_roots(roots, shallow, &tx).await;
            drop(tx);
            result
        };
        let consumer = async {
            let mut tasks = Vec::new();
            let mut failures = Vec::new();
            while let Some(event) = rx.recv().await {
                match event {
                    PlanEvent::Task(task) => {
                        on_task(&task);
                        tasks.push(task);
                    }
                    PlanEvent::Failed(failure) => failures.push(failure),
                }
            }
            (tasks, failures)
        };

        let (resolved, (tasks, failures)) = tokio::join!(producer, consumer);
        PlanOutcome {
            roots: resolved,
            tasks,
            failures,
        }
    }

    /// Plan roots in order, sending trees and failures to `tx`.
    ///
    /// Returns the roots that resolved.
    pub async fn plan_roots(
        &self,
        roots: &[String],
        shallow: bool,
        tx: &mpsc::Sender<PlanEvent>,
    ) -> Vec<Arc<Item>> {
        let mut resolved = Vec::new();

        for id in roots {
            let result = match self.resolve(id).await {
                Ok(item) => {
                    tracing::info!("{}", item.describe());
                    resolved.push(item.clone());
                    self.plan(item, shallow, tx).await
                }
                Err(error) => Err(error),
            };
            if isolate(tx, id, result).await.is_err() {
                break;
            }
        }

        resolved
    }

    /// Plan one item and everything below it.
    pub fn plan<'a>(
        &'a self,
        item: Arc<Item>,
        shallow: bool,
        tx: &'a mpsc::Sender<PlanEvent>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let result = match item.kind {
                ItemKind::Series => self.plan_series(&item, shallow, tx).await,
                ItemKind::Season => self.plan_season(&item, shallow, tx).await,
                ItemKind::BoxSet | ItemKind::Playlist | ItemKind::CollectionFolder => {
                    self.plan_collection(&item, shallow, tx).await
                }
                ItemKind::Movie | ItemKind::Episode => self.plan_leaf(&item, tx).await,
                ItemKind::Unsupported(ref raw) => {
                    tracing::info!("Downloading {} items not yet supported ({})", raw, item.id);
                    Ok(())
                }
            };

            match result {
                Err(Error::MissingField { item, field }) => {
                    tracing::warn!("Skipping item {}: missing {}", item, field);
                    Ok(())
                }
                other => other,
            }
        }
        .boxed()
    }

    async fn plan_collection(
        &self,
        collection: &Item,
        shallow: bool,
        tx: &mpsc::Sender<PlanEvent>,
    ) -> Result<()> {
        let dir = naming::item_dir_name(&self.config.naming, collection).unwrap_or_default();
        emit(tx, FetchTask::folder(dir, None)).await?;

        let children = self.catalog.get_item_children(&collection.id).await?;
        tracing::debug!("{} children in {}", children.len(), collection.id);
        for child in children {
            self.plan_child(child, shallow, tx).await?;
        }
        Ok(())
    }

    /// Plan a listed child. Its failure is reported and does not stop the
    /// caller's loop; only cancellation is returned.
    async fn plan_child(
        &self,
        child: Item,
        shallow: bool,
        tx: &mpsc::Sender<PlanEvent>,
    ) -> Result<()> {
        let id = child.id.clone();
        let child = self.cache.insert(child).await;
        let result = self.plan(child, shallow, tx).await;
        isolate(tx, &id, result).await
    }

    async fn plan_series(
        &self,
        series: &Item,
        shallow: bool,
        tx: &mpsc::Sender<PlanEvent>,
    ) -> Result<()> {
        let dir = naming::item_dir_name(&self.config.naming, series).unwrap_or_default();
        let sidecar = FetchTask::nfo(naming::join([dir.as_str(), "tvshow.nfo"]), nfo::generate_nfo(series)?);
        let images = self.images(series, &dir, None).await;
        emit(tx, FetchTask::folder(dir, Some(sidecar)).with_aux(images)).await?;

        if !shallow {
            let seasons = self.catalog.get_seasons(&series.id).await?;
            for mut season in seasons {
                season.series_id.get_or_insert_with(|| series.id.clone());
                self.plan_child(season, shallow, tx).await?;
            }
        }
        Ok(())
    }

    async fn plan_season(
        &self,
        season: &Item,
        shallow: bool,
        tx: &mpsc::Sender<PlanEvent>,
    ) -> Result<()> {
        let series_id = require(season, season.series_id.as_deref(), "SeriesId")?;
        let series_dir = self.item_path(series_id).await?;
        let season_dir = naming::item_dir_name(&self.config.naming, season).unwrap_or_default();
        let dir = naming::join([series_dir, season_dir]);

        let sidecar = FetchTask::nfo(naming::join([dir.as_str(), "season.nfo"]), nfo::generate_nfo(season)?);
        let images = self.images(season, &dir, None).await;
        emit(tx, FetchTask::folder(dir, Some(sidecar)).with_aux(images)).await?;

        if !shallow {
            let episodes = self.catalog.get_episodes(series_id, &season.id).await?;
            for mut episode in episodes {
                episode.series_id.get_or_insert_with(|| series_id.to_string());
                episode.season_id.get_or_insert_with(|| season.id.clone());
                self.plan_child(episode, shallow, tx).await?;
            }
        }
        Ok(())
    }

    /// Movies and episodes: one tree per eligible media source.
    async fn plan_leaf(&self, item: &Item, tx: &mpsc::Sender<PlanEvent>) -> Result<()> {
        let dir = self.leaf_dir(item).await?;
        let is_episode = item.kind == ItemKind::Episode;

        // Movie artwork is shared by all renditions and goes on the first tree.
        let mut movie_images = if is_episode {
            Vec::new()
        } else {
            self.images(item, &dir, None).await
        };

        for source in &item.media_sources {
            if is_episode && !source.is_default() {
                tracing::debug!(
                    "Skipping alternate media source {} on {}",
                    source.id,
                    item.id
                );
                continue;
            }
            let Some(stem) = source.name.as_deref().map(naming::strip_illegal) else {
                tracing::info!("No name for media {} on item {}", source.id, item.id);
                continue;
            };
            let Some(container) = source.container.as_deref() else {
                tracing::info!("No container for media {} on item {}", source.id, item.id);
                continue;
            };

            let images = if is_episode {
                let prefix = format!("{}-", stem);
                self.images(item, &dir, Some(prefix.as_str())).await
            } else {
                std::mem::take(&mut movie_images)
            };
            let tree = self
                .media_tree(item, &dir, &stem, container, source)?
                .with_aux(images);
            emit(tx, tree).await?;
        }

        // No usable source took the movie artwork.
        if !movie_images.is_empty() {
            emit(tx, FetchTask::folder(dir, None).with_aux(movie_images)).await?;
        }
        Ok(())
    }

    fn media_tree(
        &self,
        item: &Item,
        dir: &str,
        stem: &str,
        container: &str,
        source: &MediaSource,
    ) -> Result<FetchTask> {
        let media_path = naming::join([dir, format!("{}.{}", stem, container).as_str()]);
        let nfo_path = naming::join([dir, format!("{}.nfo", stem).as_str()]);

        let externals = source
            .media_streams
            .iter()
            .filter(|s| s.is_external)
            .filter_map(|stream| external_task(item, source, dir, stem, stream));

        Ok(FetchTask::stream(
            media_path,
            FetchKind::Media,
            StreamRequest::Media {
                media_source_id: source.id.clone(),
            },
            source.size,
        )
        .with_metadata(FetchTask::nfo(nfo_path, nfo::generate_nfo(item)?))
        .with_aux(externals))
    }

    /// Directory of a movie or episode.
    async fn leaf_dir(&self, item: &Item) -> Result<String> {
        match item.kind {
            ItemKind::Episode => {
                let series_id = require(item, item.series_id.as_deref(), "SeriesId")?;
                let series_dir = self.item_path(series_id).await?;
                match item.season_id.as_deref() {
                    Some(season_id) => {
                        let season_dir = self.item_path(season_id).await?;
                        Ok(naming::join([series_dir, season_dir]))
                    }
                    None => Ok(series_dir),
                }
            }
            _ => Ok(naming::item_dir_name(&self.config.naming, item).unwrap_or_default()),
        }
    }

    /// Directory name of an item looked up by id through the cache.
    async fn item_path(&self, id: &str) -> Result<String> {
        let item = self.resolve(id).await?;
        naming::item_dir_name(&self.config.naming, &item)
            .ok_or_else(|| Error::Unsupported(format!("No path pattern for {} items", item.kind)))
    }

    /// Artwork tasks for an item. Lookup failures only lose the artwork.
    async fn images(&self, item: &Item, dir: &str, prefix: Option<&str>) -> Vec<FetchTask> {
        if !self.config.with_images {
            return Vec::new();
        }
        let images = match self.catalog.get_item_images(&item.id).await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!("Cannot list images for {}: {}", item.id, e);
                return Vec::new();
            }
        };
        images
            .into_iter()
            .map(|image| {
                let path = naming::join([dir, naming::image_file_name(&image, prefix).as_str()]);
                FetchTask::stream(
                    path,
                    FetchKind::Image,
                    StreamRequest::Image {
                        item_id: item.id.clone(),
                        image_type: image.image_type.clone(),
                        image_index: image.image_index,
                    },
                    image.size,
                )
            })
            .collect()
    }
}

/// Subtitle format for a supported external stream.
fn subtitle_format(stream: &MediaStream) -> Option<&'static str> {
    match stream.codec.as_deref().map(str::to_lowercase).as_deref() {
        Some("srt") | Some("subrip") => Some("srt"),
        Some("webvtt") => Some("vtt"),
        _ => None,
    }
}

fn external_task(
    item: &Item,
    source: &MediaSource,
    dir: &str,
    stem: &str,
    stream: &MediaStream,
) -> Option<FetchTask> {
    if stream.stream_type != StreamType::Subtitle {
        tracing::debug!("Downloading {} streams not yet supported", stream.stream_type);
        return None;
    }
    let Some(format) = subtitle_format(stream) else {
        tracing::debug!(
            "Downloading {} subtitle streams not yet supported",
            stream.codec.as_deref().unwrap_or("unknown")
        );
        return None;
    };

    let name = format!("{}.{}", naming::external_stream_stem(stem, stream), format);
    Some(FetchTask::stream(
        naming::join([dir, name.as_str()]),
        FetchKind::External,
        StreamRequest::Subtitle {
            item_id: item.id.clone(),
            media_source_id: source.id.clone(),
            stream_index: stream.index,
            format: format.to_string(),
        },
        None,
    ))
}

fn require<'a>(item: &Item, value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    value.ok_or_else(|| Error::MissingField {
        item: item.id.clone(),
        field,
    })
}

async fn emit(tx: &mpsc::Sender<PlanEvent>, task: FetchTask) -> Result<()> {
    tx.send(PlanEvent::Task(task))
        .await
        .map_err(|_| Error::Cancelled)
}

/// Turn a failed plan into a reported failure. Only cancellation is returned.
async fn isolate(tx: &mpsc::Sender<PlanEvent>, id: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(error) => {
            tracing::error!("Planning {} failed: {}", id, error);
            let failure = PlanFailure {
                item: id.to_string(),
                error,
            };
            tx.send(PlanEvent::Failed(failure))
                .await
                .map_err(|_| Error::Cancelled)
        }
    }
}
