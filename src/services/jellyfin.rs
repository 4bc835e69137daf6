//! Jellyfin API client.

use crate::models::item::{ImageInfo, Item, ItemQueryResult};
use crate::models::session::ServerSession;
use crate::services::catalog::{ByteStream, Catalog};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const CLIENT_NAME: &str = "jellyfetch";

/// Item fields requested on listings.
const ITEM_FIELDS: &str =
    "Path,ProviderIds,Overview,OriginalTitle,MediaSources,RecursiveItemCount";

/// Jellyfin client configuration.
#[derive(Debug, Clone)]
pub struct JellyfinConfig {
    /// Base URL of the server.
    pub server: String,
    pub device_id: String,
    pub device_name: String,
    /// Saved session, if any.
    pub session: Option<ServerSession>,
}

impl JellyfinConfig {
    pub fn new(server: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            device_id: device_id.into(),
            device_name: whoami::devicename(),
            session: None,
        }
    }
}

/// Jellyfin API client.
pub struct JellyfinClient {
    config: JellyfinConfig,
    client: reqwest::Client,
}

/// User record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
}

/// Authentication response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    user: User,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticateByName<'a> {
    username: &'a str,
    pw: &'a str,
}

/// Public server information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicSystemInfo {
    pub server_name: Option<String>,
    pub version: Option<String>,
    pub id: Option<String>,
}

impl JellyfinClient {
    /// Create a new Jellyfin client.
    pub fn new(config: JellyfinConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }

    /// Current session, once authenticated.
    pub fn session(&self) -> Option<&ServerSession> {
        self.config.session.as_ref()
    }

    /// Value of the `X-Emby-Authorization` header.
    fn authorization_header(&self) -> String {
        let mut parts = vec![
            format!("MediaBrowser Client=\"{}\"", CLIENT_NAME),
            format!("Device=\"{}\"", self.config.device_name.replace('"', "")),
            format!("DeviceId=\"{}\"", self.config.device_id),
            format!("Version=\"{}\"", env!("CARGO_PKG_VERSION")),
        ];
        if let Some(ref session) = self.config.session {
            parts.push(format!("Token=\"{}\"", session.access_token));
        }
        parts.join(", ")
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.server.trim_end_matches('/'), path)
    }

    /// Build a request with proper authentication.
    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.build_url(path))
            .header("X-Emby-Authorization", self.authorization_header())
    }

    fn user_id(&self) -> Result<&str> {
        self.config
            .session
            .as_ref()
            .map(|s| s.user_id.as_str())
            .ok_or_else(|| Error::Auth("not signed in".to_string()))
    }

    /// Send a GET and map error statuses.
    async fn get(&self, path: &str, what: &str) -> Result<reqwest::Response> {
        let resp = self
            .build_request(reqwest::Method::GET, path)
            .send()
            .await?;
        check_status(resp, what)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        Ok(self.get(path, what).await?.json().await?)
    }

    async fn get_stream(&self, path: &str, what: &str) -> Result<ByteStream> {
        let resp = self.get(path, what).await?;
        Ok(resp.bytes_stream().map(|r| r.map_err(Error::from)).boxed())
    }

    /// Fetch unauthenticated server info.
    pub async fn public_info(&self) -> Result<PublicSystemInfo> {
        self.get_json("/System/Info/Public", "server info").await
    }

    /// Sign in with username and password.
    pub async fn authenticate_by_name(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<ServerSession> {
        let resp = self
            .build_request(reqwest::Method::POST, "/Users/AuthenticateByName")
            .json(&AuthenticateByName {
                username,
                pw: password,
            })
            .send()
            .await?;
        let auth: AuthenticationResult = check_status(resp, "authentication")?.json().await?;

        let session = ServerSession {
            user_id: auth.user.id,
            access_token: auth.access_token,
        };
        tracing::info!(
            "Signed in to {} as {}",
            self.config.server,
            auth.user.name.as_deref().unwrap_or(&session.user_id)
        );
        self.config.session = Some(session.clone());
        Ok(session)
    }

    /// Check that the saved session is still accepted.
    pub async fn current_user(&self) -> Result<User> {
        self.get_json("/Users/Me", "current user").await
    }
}

/// Map an HTTP response status onto the error taxonomy.
fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    match resp.status() {
        s if s.is_success() => Ok(resp),
        StatusCode::NOT_FOUND => Err(Error::NotFound(what.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::Auth(format!("{} returned {}", what, resp.status())))
        }
        _ => Err(resp.error_for_status().err().map(Error::from).unwrap_or_else(|| {
            Error::other(format!("unexpected response for {}", what))
        })),
    }
}

#[async_trait]
impl Catalog for JellyfinClient {
    async fn get_item(&self, id: &str) -> Result<Item> {
        let path = format!(
            "/Users/{}/Items/{}",
            self.user_id()?,
            urlencoding::encode(id)
        );
        self.get_json(&path, id).await
    }

    async fn get_item_children(&self, parent_id: &str) -> Result<Vec<Item>> {
        let path = format!(
            "/Users/{}/Items?ParentId={}&fields={}",
            self.user_id()?,
            urlencoding::encode(parent_id),
            ITEM_FIELDS
        );
        let result: ItemQueryResult = self.get_json(&path, parent_id).await?;
        Ok(result.items)
    }

    async fn get_seasons(&self, series_id: &str) -> Result<Vec<Item>> {
        let path = format!(
            "/Shows/{}/Seasons?userId={}&fields={}",
            urlencoding::encode(series_id),
            self.user_id()?,
            ITEM_FIELDS
        );
        let result: ItemQueryResult = self.get_json(&path, series_id).await?;
        Ok(result.items)
    }

    async fn get_episodes(&self, series_id: &str, season_id: &str) -> Result<Vec<Item>> {
        let path = format!(
            "/Shows/{}/Episodes?seasonId={}&userId={}&fields={}",
            urlencoding::encode(series_id),
            urlencoding::encode(season_id),
            self.user_id()?,
            ITEM_FIELDS
        );
        let result: ItemQueryResult = self.get_json(&path, season_id).await?;
        Ok(result.items)
    }

    async fn get_item_images(&self, item_id: &str) -> Result<Vec<ImageInfo>> {
        let path = format!("/Items/{}/Images", urlencoding::encode(item_id));
        self.get_json(&path, item_id).await
    }

    async fn open_media(&self, media_source_id: &str) -> Result<ByteStream> {
        let path = format!("/Items/{}/File", urlencoding::encode(media_source_id));
        self.get_stream(&path, media_source_id).await
    }

    async fn open_subtitle(
        &self,
        item_id: &str,
        media_source_id: &str,
        stream_index: i32,
        format: &str,
    ) -> Result<ByteStream> {
        let path = format!(
            "/Videos/{}/{}/Subtitles/{}/Stream.{}",
            urlencoding::encode(item_id),
            urlencoding::encode(media_source_id),
            stream_index,
            format
        );
        self.get_stream(&path, item_id).await
    }

    async fn open_image(
        &self,
        item_id: &str,
        image_type: &str,
        image_index: Option<u32>,
    ) -> Result<ByteStream> {
        let mut path = format!(
            "/Items/{}/Images/{}",
            urlencoding::encode(item_id),
            urlencoding::encode(image_type)
        );
        if let Some(index) = image_index {
            path.push_str(&format!("/{}", index));
        }
        self.get_stream(&path, item_id).await
    }
}
