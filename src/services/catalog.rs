//! Catalog interface.
//!
//! The planner and executor only talk to the server through this trait, so
//! tests can swap in an in-memory catalog.

use crate::models::item::{ImageInfo, Item};
use crate::models::task::StreamRequest;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Byte stream of a media, subtitle or image payload.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Read-only access to a media catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_item(&self, id: &str) -> Result<Item>;

    async fn get_item_children(&self, parent_id: &str) -> Result<Vec<Item>>;

    async fn get_seasons(&self, series_id: &str) -> Result<Vec<Item>>;

    async fn get_episodes(&self, series_id: &str, season_id: &str) -> Result<Vec<Item>>;

    async fn get_item_images(&self, item_id: &str) -> Result<Vec<ImageInfo>>;

    async fn open_media(&self, media_source_id: &str) -> Result<ByteStream>;

    async fn open_subtitle(
        &self,
        item_id: &str,
        media_source_id: &str,
        stream_index: i32,
        format: &str,
    ) -> Result<ByteStream>;

    async fn open_image(
        &self,
        item_id: &str,
        image_type: &str,
        image_index: Option<u32>,
    ) -> Result<ByteStream>;
}

impl StreamRequest {
    /// Open the stream this request describes.
    pub async fn open(&self, catalog: &dyn Catalog) -> Result<ByteStream> {
        match self {
            StreamRequest::Media { media_source_id } => catalog.open_media(media_source_id).await,
            StreamRequest::Subtitle {
                item_id,
                media_source_id,
                stream_index,
                format,
            } => {
                catalog
                    .open_subtitle(item_id, media_source_id, *stream_index, format)
                    .await
            }
            StreamRequest::Image {
                item_id,
                image_type,
                image_index,
            } => catalog.open_image(item_id, image_type, *image_index).await,
        }
    }
}
