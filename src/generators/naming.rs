//! Destination path naming.
//!
//! Directory names come from per-type templates (`{Name} ({ProductionYear})`);
//! file names derive from the media source name with suffixes appended.

use crate::models::config::NamingConfig;
use crate::models::item::{ImageInfo, Item, ItemKind, MediaStream};
use regex::Regex;
use std::sync::OnceLock;

/// Characters that are illegal in file names on at least one platform.
const STRIP_CHARS: &[char] = &[':', '*', '<', '>', '"', '?', '|', '\\', '/'];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-zA-Z]+)\}").expect("valid placeholder regex"))
}

/// Remove path-illegal characters.
pub fn strip_illegal(s: &str) -> String {
    s.chars().filter(|c| !STRIP_CHARS.contains(c)).collect()
}

/// Look up a template field on an item.
fn field_value(item: &Item, field: &str) -> Option<String> {
    match field {
        "Name" => item.name.as_deref().map(strip_illegal),
        "OriginalTitle" => item.original_title.as_deref().map(strip_illegal),
        "Id" => Some(strip_illegal(&item.id)),
        "ProductionYear" => item.production_year.map(|v| v.to_string()),
        "IndexNumber" => item.index_number.map(|v| v.to_string()),
        "ParentIndexNumber" => item.parent_index_number.map(|v| v.to_string()),
        _ => None,
    }
}

/// Render a template against an item.
///
/// Only interpolated values are stripped; literal template text is kept.
/// Unknown or absent fields leave the placeholder in place.
pub fn render_template(template: &str, item: &Item) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            field_value(item, &caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Directory name for an item, if its type has a template.
pub fn item_dir_name(naming: &NamingConfig, item: &Item) -> Option<String> {
    let template = match item.kind {
        ItemKind::Movie => &naming.movie,
        ItemKind::Series => &naming.series,
        ItemKind::Season => &naming.season,
        ItemKind::BoxSet | ItemKind::Playlist | ItemKind::CollectionFolder => {
            &naming.collection
        }
        ItemKind::Episode | ItemKind::Unsupported(_) => return None,
    };
    Some(render_template(template, item))
}

/// Join POSIX path segments, ignoring empty ones.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter(|p| !p.as_ref().is_empty())
        .map(|p| p.as_ref().trim_matches('/').to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// File stem for an external stream:
/// `{stem}[.title][.language][.default][.forced]`.
pub fn external_stream_stem(stem: &str, stream: &MediaStream) -> String {
    let mut name = stem.to_string();
    if let Some(ref title) = stream.title {
        name.push('.');
        name.push_str(&strip_illegal(title));
    }
    if let Some(ref language) = stream.language {
        name.push('.');
        name.push_str(&strip_illegal(language));
    }
    if stream.is_default {
        name.push_str(".default");
    }
    if stream.is_forced {
        name.push_str(".forced");
    }
    name
}

/// File name for an image.
///
/// Primary images become `folder` on containers and `thumb` when prefixed
/// with a media stem.
pub fn image_file_name(image: &ImageInfo, prefix: Option<&str>) -> String {
    let base = if image.image_type == "Primary" {
        if prefix.is_some() {
            "thumb".to_string()
        } else {
            "folder".to_string()
        }
    } else {
        image.image_type.to_lowercase()
    };
    let index = image
        .image_index
        .filter(|i| *i > 0)
        .map(|i| i.to_string())
        .unwrap_or_default();
    let ext = image
        .path
        .as_deref()
        .and_then(|p| p.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && !ext.contains('/') && !ext.contains('\\'))
        .map(|ext| if ext == "jpeg" { "jpg".to_string() } else { ext })
        .unwrap_or_else(|| "jpg".to_string());

    format!("{}{}{}.{}", prefix.unwrap_or(""), base, index, ext)
}
