//! NFO file generator (Kodi compatible).

use crate::models::item::{Item, ItemKind};
use crate::Result;

/// Root element name for an item type.
fn root_element(kind: &ItemKind) -> Option<&'static str> {
    match kind {
        ItemKind::Movie => Some("movie"),
        ItemKind::Series => Some("tvshow"),
        ItemKind::Season => Some("season"),
        ItemKind::Episode => Some("episodedetails"),
        _ => None,
    }
}

/// Generate NFO content for an item.
///
/// The output is a pure function of the item.
pub fn generate_nfo(item: &Item) -> Result<String> {
    let root = root_element(&item.kind).ok_or_else(|| {
        crate::Error::Unsupported(format!("Cannot make NFO for {} items", item.kind))
    })?;

    let mut nfo = String::new();
    nfo.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    nfo.push_str(&format!("<{}>\n", root));

    push_element(&mut nfo, "plot", item.overview.as_deref().unwrap_or(""));
    push_element(&mut nfo, "title", item.name.as_deref().unwrap_or(""));
    if let Some(ref original_title) = item.original_title {
        push_element(&mut nfo, "originaltitle", original_title);
    }
    if let Some(year) = item.production_year {
        push_element(&mut nfo, "year", &year.to_string());
    }

    // Provider ids
    let ids = &item.provider_ids;
    if let Some(ref tvdb) = ids.tvdb {
        push_element(&mut nfo, "tvdbid", tvdb);
    }
    if let Some(ref imdb) = ids.imdb {
        let tag = if item.kind == ItemKind::Series {
            "imdb_id"
        } else {
            "imdbid"
        };
        push_element(&mut nfo, tag, imdb);
    }
    if let Some(ref tvrage) = ids.tv_rage {
        push_element(&mut nfo, "tvrageid", tvrage);
    }
    if let Some(ref tmdb) = ids.tmdb {
        push_element(&mut nfo, "tmdbid", tmdb);
    }

    match item.kind {
        ItemKind::Series => {
            push_element(&mut nfo, "season", "-1");
            push_element(&mut nfo, "episode", "-1");
        }
        ItemKind::Season => {
            if let Some(number) = item.index_number {
                push_element(&mut nfo, "seasonnumber", &number.to_string());
            }
        }
        ItemKind::Episode => {
            if let Some(season) = item.parent_index_number {
                push_element(&mut nfo, "season", &season.to_string());
            }
            if let Some(episode) = item.index_number {
                push_element(&mut nfo, "episode", &episode.to_string());
            }
            if let Some(end) = item.index_number_end {
                push_element(&mut nfo, "episodenumberend", &end.to_string());
            }
            if let Some(n) = item.airs_after_season_number {
                push_element(&mut nfo, "airsafter_season", &n.to_string());
            }
            if let Some(n) = item.airs_before_episode_number {
                push_element(&mut nfo, "airsbefore_episode", &n.to_string());
            }
            if let Some(n) = item.airs_before_season_number {
                push_element(&mut nfo, "airsbefore_season", &n.to_string());
            }
        }
        _ => {}
    }

    nfo.push_str(&format!("</{}>\n", root));
    Ok(nfo)
}

fn push_element(nfo: &mut String, tag: &str, value: &str) {
    if value.is_empty() {
        nfo.push_str(&format!("  <{}/>\n", tag));
    } else {
        nfo.push_str(&format!("  <{}>{}</{}>\n", tag, escape_xml(value), tag));
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::ProviderIds;

    #[test]
    fn test_generate_movie_nfo() {
        let movie = Item {
            id: "m".to_string(),
            kind: ItemKind::Movie,
            name: Some("Tom & Jerry".to_string()),
            production_year: Some(2021),
            provider_ids: ProviderIds {
                imdb: Some("tt1361336".to_string()),
                tmdb: Some("587807".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let nfo = generate_nfo(&movie).unwrap();
        assert!(nfo.starts_with("<?xml"));
        assert!(nfo.contains("<movie>"));
        assert!(nfo.contains("<title>Tom &amp; Jerry</title>"));
        assert!(nfo.contains("<year>2021</year>"));
        assert!(nfo.contains("<imdbid>tt1361336</imdbid>"));
        assert!(nfo.contains("<tmdbid>587807</tmdbid>"));
        assert!(nfo.contains("<plot/>"));
        assert!(nfo.trim_end().ends_with("</movie>"));
    }

    #[test]
    fn test_series_uses_imdb_id_tag() {
        let series = Item {
            kind: ItemKind::Series,
            name: Some("Show".to_string()),
            provider_ids: ProviderIds {
                imdb: Some("tt0000001".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let nfo = generate_nfo(&series).unwrap();
        assert!(nfo.contains("<tvshow>"));
        assert!(nfo.contains("<imdb_id>tt0000001</imdb_id>"));
        assert!(nfo.contains("<season>-1</season>"));
    }

    #[test]
    fn test_episode_numbers() {
        let episode = Item {
            kind: ItemKind::Episode,
            name: Some("Pilot".to_string()),
            parent_index_number: Some(1),
            index_number: Some(1),
            index_number_end: Some(2),
            ..Default::default()
        };
        let nfo = generate_nfo(&episode).unwrap();
        assert!(nfo.contains("<episodedetails>"));
        assert!(nfo.contains("<season>1</season>"));
        assert!(nfo.contains("<episode>1</episode>"));
        assert!(nfo.contains("<episodenumberend>2</episodenumberend>"));
    }

    #[test]
    fn test_unsupported_kind() {
        let boxset = Item {
            kind: ItemKind::BoxSet,
            ..Default::default()
        };
        assert!(matches!(
            generate_nfo(&boxset),
            Err(crate::Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let season = Item {
            kind: ItemKind::Season,
            name: Some("Season 2".to_string()),
            index_number: Some(2),
            ..Default::default()
        };
        assert_eq!(generate_nfo(&season).unwrap(), generate_nfo(&season).unwrap());
    }
}
