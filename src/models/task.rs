//! Task tree data model.
//!
//! A [`FetchTask`] is one plan unit: a destination path with an optional
//! payload, an optional metadata child (the NFO sidecar) and auxiliary
//! children (external subtitles, artwork). Trees are immutable once planned;
//! skip decisions are carried separately in a [`SkipSet`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a task writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    /// Container directory node, never written itself.
    Folder,
    Nfo,
    Media,
    Image,
    External,
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchKind::Folder => write!(f, "folder"),
            FetchKind::Nfo => write!(f, "nfo"),
            FetchKind::Media => write!(f, "media"),
            FetchKind::Image => write!(f, "image"),
            FetchKind::External => write!(f, "external"),
        }
    }
}

/// Byte stream to open from the catalog when the task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    Media {
        media_source_id: String,
    },
    Subtitle {
        item_id: String,
        media_source_id: String,
        stream_index: i32,
        format: String,
    },
    Image {
        item_id: String,
        image_type: String,
        image_index: Option<u32>,
    },
}

/// Task payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Nothing to write (container nodes).
    None,
    /// Already materialized text, written in one shot.
    Text(String),
    /// Lazily opened byte stream.
    Stream(StreamRequest),
}

/// A node of a task tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// Destination path, relative and `/`-separated.
    pub path: String,
    pub kind: FetchKind,
    pub payload: Payload,
    /// Known size in bytes; `None` until the transfer completes.
    pub size: Option<u64>,
    pub metadata: Option<Box<FetchTask>>,
    pub aux: Vec<FetchTask>,
}

/// A writable leaf destination as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination<'a> {
    pub path: &'a str,
    pub kind: FetchKind,
    pub size: Option<u64>,
}

impl FetchTask {
    /// Container node: a directory with an optional sidecar.
    pub fn folder(path: impl Into<String>, metadata: Option<FetchTask>) -> Self {
        Self {
            path: path.into(),
            kind: FetchKind::Folder,
            payload: Payload::None,
            size: None,
            metadata: metadata.map(Box::new),
            aux: Vec::new(),
        }
    }

    /// Text sidecar; its size is the byte length of the text.
    pub fn nfo(path: impl Into<String>, text: String) -> Self {
        Self {
            path: path.into(),
            kind: FetchKind::Nfo,
            size: Some(text.len() as u64),
            payload: Payload::Text(text),
            metadata: None,
            aux: Vec::new(),
        }
    }

    /// Streamed payload of the given kind.
    pub fn stream(
        path: impl Into<String>,
        kind: FetchKind,
        request: StreamRequest,
        size: Option<u64>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            payload: Payload::Stream(request),
            size,
            metadata: None,
            aux: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: FetchTask) -> Self {
        self.metadata = Some(Box::new(metadata));
        self
    }

    pub fn with_aux(mut self, aux: impl IntoIterator<Item = FetchTask>) -> Self {
        self.aux.extend(aux);
        self
    }

    /// Whether this node writes anything itself.
    pub fn has_payload(&self) -> bool {
        !matches!(self.payload, Payload::None)
    }

    /// Whether this node's own path is skipped. Children are not affected.
    pub fn is_skipped(&self, skip: &SkipSet) -> bool {
        skip.contains(&self.path)
    }

    /// Recursive size of everything that will be written.
    ///
    /// Unknown sizes count as zero.
    pub fn total_size(&self, skip: &SkipSet) -> u64 {
        let own = if self.is_skipped(skip) {
            0
        } else {
            self.size.unwrap_or(0)
        };
        own + self
            .metadata
            .as_ref()
            .map(|m| m.total_size(skip))
            .unwrap_or(0)
            + self.aux.iter().map(|a| a.total_size(skip)).sum::<u64>()
    }

    /// Whether every non-skipped payload in the tree has a known size.
    pub fn known_size(&self, skip: &SkipSet) -> bool {
        self.destinations(skip).iter().all(|d| d.size.is_some())
    }

    /// Leaf destinations, without side effects.
    ///
    /// Order: metadata child, own payload (unless skipped), auxiliaries.
    pub fn list(&self, skip: &SkipSet) -> Vec<(&str, Option<u64>)> {
        self.destinations(skip)
            .into_iter()
            .map(|d| (d.path, d.size))
            .collect()
    }

    /// Like [`list`](Self::list) but with the kind of each destination.
    pub fn destinations(&self, skip: &SkipSet) -> Vec<Destination<'_>> {
        let mut out = Vec::new();
        self.collect_destinations(Some(skip), &mut out);
        out
    }

    /// Every payload destination in the tree, skipped or not.
    pub fn all_destinations(&self) -> Vec<Destination<'_>> {
        let mut out = Vec::new();
        self.collect_destinations(None, &mut out);
        out
    }

    fn collect_destinations<'a>(&'a self, skip: Option<&SkipSet>, out: &mut Vec<Destination<'a>>) {
        if let Some(ref metadata) = self.metadata {
            metadata.collect_destinations(skip, out);
        }
        let skipped = skip.map(|s| self.is_skipped(s)).unwrap_or(false);
        if self.has_payload() && !skipped {
            out.push(Destination {
                path: &self.path,
                kind: self.kind,
                size: self.size,
            });
        }
        for aux in &self.aux {
            aux.collect_destinations(skip, out);
        }
    }

    /// Flatten into single nodes in execution order, consuming the tree.
    ///
    /// Order matches [`list`](Self::list): metadata, own payload, auxiliaries.
    pub fn into_nodes(self) -> Vec<FetchTask> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<FetchTask>) {
        let FetchTask {
            path,
            kind,
            payload,
            size,
            metadata,
            aux,
        } = self;
        if let Some(metadata) = metadata {
            metadata.flatten_into(out);
        }
        if !matches!(payload, Payload::None) {
            out.push(FetchTask {
                path,
                kind,
                payload,
                size,
                metadata: None,
                aux: Vec::new(),
            });
        }
        for a in aux {
            a.flatten_into(out);
        }
    }
}

/// Destination paths that must not be written this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    paths: BTreeSet<String>,
}

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for SkipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}
