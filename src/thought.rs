//! Thought nodes: one unit of content plus its Hydra network metadata
//!
//! A thought knows how to render itself for a document host, how to derive an
//! evolved successor, and how to recover itself from a hosted document.

use crate::error::{GhostError, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(feature = "ts-rs")]
use ts_rs::TS;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;
pub const DEFAULT_PRIORITY: u8 = 5;
pub const INITIAL_VERSION: &str = "1.0.0";

const HEADER_DELIMITER: &str = "---";
const HEADER_TITLE: &str = "# Hydra Network Metadata";
const FILENAME_STEM_LIMIT: usize = 50;

/// Current UTC time in the fixed-width form used for every stored timestamp
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Lifecycle status of a thought
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
#[serde(rename_all = "lowercase")]
pub enum ThoughtStatus {
    #[default]
    New,
    Processing,
    Complete,
    Evolving,
}

impl ThoughtStatus {
    pub const ALL: [ThoughtStatus; 4] = [
        ThoughtStatus::New,
        ThoughtStatus::Processing,
        ThoughtStatus::Complete,
        ThoughtStatus::Evolving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThoughtStatus::New => "new",
            ThoughtStatus::Processing => "processing",
            ThoughtStatus::Complete => "complete",
            ThoughtStatus::Evolving => "evolving",
        }
    }
}

impl fmt::Display for ThoughtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThoughtStatus {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        ThoughtStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| GhostError::InvalidStatus(s.to_string()))
    }
}

/// Content format of a thought's hosted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
pub enum ContentFormat {
    #[default]
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "txt")]
    Plain,
}

impl ContentFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            ContentFormat::Markdown => "md",
            ContentFormat::Json => "json",
            ContentFormat::Plain => "txt",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentFormat::Markdown => ".md",
            ContentFormat::Json => ".json",
            ContentFormat::Plain => ".txt",
        }
    }

    /// Parse a format tag, treating anything unrecognized as markdown
    pub fn from_tag_lossy(tag: &str) -> Self {
        tag.parse().unwrap_or_default()
    }

    fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContentFormat {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "md" | "markdown" => Ok(ContentFormat::Markdown),
            "json" => Ok(ContentFormat::Json),
            "txt" | "plain" => Ok(ContentFormat::Plain),
            other => Err(GhostError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn fresh_node_tag() -> String {
    Uuid::new_v4().to_string()
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn default_version() -> String {
    INITIAL_VERSION.to_string()
}

fn default_origin() -> String {
    "unknown".to_string()
}

/// One thought in the network.
///
/// Field names on disk follow the snapshot schema (`gist_id`, `origin_hydra`, ...),
/// so older snapshots and hosted documents keep decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
pub struct ThoughtNode {
    /// Host-assigned id; `None` until the thought has been published
    #[serde(rename = "gist_id", default)]
    pub id: Option<String>,
    #[serde(rename = "origin_hydra", default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "file_format", default)]
    pub format: ContentFormat,
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "parent_gist", default)]
    pub parent_id: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub status: ThoughtStatus,
    #[serde(default = "now_timestamp")]
    pub timestamp: String,
    /// Locally generated tag, stable before the host id exists
    #[serde(rename = "node_id", default = "fresh_node_tag")]
    pub node_tag: String,
}

/// Metadata block embedded in hosted documents, in header order
#[derive(Debug, Serialize)]
struct HeaderMetadata<'a> {
    origin_hydra: &'a str,
    intent: &'a str,
    priority: u8,
    timestamp: &'a str,
    version: &'a str,
    status: ThoughtStatus,
    node_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_gist: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct EmbeddedDocument<'a> {
    metadata: HeaderMetadata<'a>,
    content: &'a str,
}

/// A single file inside a hosted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// Payload handed to a document host when creating or updating a thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, RemoteFile>,
}

/// A document as returned by a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteGist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFile>,
}

/// The three shapes a hosted file body can take
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// `---` delimited header followed by the body
    Header { metadata: Map<String, Value>, body: String },
    /// `{"metadata": {...}, "content": "..."}`
    Embedded { metadata: Map<String, Value>, body: String },
    /// No recoverable metadata
    Plain { body: String },
}

/// Classify a hosted file body into one of the known shapes.
///
/// Returns `None` only for a body that looks like embedded JSON but does not decode.
pub fn classify_document(content: &str) -> Option<DocumentShape> {
    if content.starts_with(HEADER_DELIMITER) {
        return Some(parse_header(content));
    }

    if content.trim_start().starts_with('{') {
        let value: Value = serde_json::from_str(content).ok()?;
        let metadata = value
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let body = match value.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        return Some(DocumentShape::Embedded { metadata, body });
    }

    Some(DocumentShape::Plain {
        body: content.to_string(),
    })
}

fn parse_header(content: &str) -> DocumentShape {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut metadata = Map::new();
    let mut in_header = false;
    let mut body_start = 0;

    for (i, line) in lines.iter().enumerate() {
        if line.trim() == HEADER_DELIMITER {
            if !in_header {
                in_header = true;
            } else {
                body_start = i + 1;
                break;
            }
        } else if in_header {
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                // Values that are not valid JSON are kept verbatim
                let parsed = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                metadata.insert(key.trim().to_string(), parsed);
            }
        }
    }

    DocumentShape::Header {
        metadata,
        body: lines[body_start..].join("\n"),
    }
}

fn metadata_str(metadata: &Map<String, Value>, key: &str) -> Option<String> {
    match metadata.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn metadata_priority(metadata: &Map<String, Value>) -> i64 {
    match metadata.get("priority") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(DEFAULT_PRIORITY as i64),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(DEFAULT_PRIORITY as i64),
        _ => DEFAULT_PRIORITY as i64,
    }
}

/// Clamp an arbitrary priority into the 1..=10 range
pub fn clamp_priority(priority: i64) -> u8 {
    priority.clamp(MIN_PRIORITY as i64, MAX_PRIORITY as i64) as u8
}

/// Derive a filename from an intent: keep alphanumerics, spaces, hyphens and
/// underscores of the lower-cased intent, turn spaces into underscores, cap at
/// 50 characters, then append `_thought` and the format's extension.
pub fn derive_filename(intent: &str, format: ContentFormat) -> String {
    let cleaned: String = intent
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem: String = cleaned
        .trim_end()
        .replace(' ', "_")
        .chars()
        .take(FILENAME_STEM_LIMIT)
        .collect();
    format!("{}_thought{}", stem, format.extension())
}

/// Bump the minor component of a `major.minor.patch` version, resetting patch.
/// Anything that is not three numeric parts restarts at `1.1.0`.
pub fn bump_version(version: &str) -> String {
    let parts: Vec<&str> = version.split('.').collect();
    if let [major, minor, _patch] = parts.as_slice() {
        if let Ok(minor) = minor.parse::<u64>() {
            return format!("{}.{}.0", major, minor + 1);
        }
    }
    "1.1.0".to_string()
}

impl ThoughtNode {
    /// Create a new, unpublished thought with status `new`
    pub fn new(
        origin: impl Into<String>,
        intent: impl Into<String>,
        priority: i64,
        content: impl Into<String>,
        format: ContentFormat,
    ) -> Self {
        let intent = intent.into();
        let filename = derive_filename(&intent, format);
        Self {
            id: None,
            origin: origin.into(),
            intent,
            priority: clamp_priority(priority),
            content: content.into(),
            format,
            filename,
            parent_id: None,
            version: INITIAL_VERSION.to_string(),
            status: ThoughtStatus::New,
            timestamp: now_timestamp(),
            node_tag: fresh_node_tag(),
        }
    }

    /// Use an explicit filename instead of the derived one
    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        if let Some(name) = filename.filter(|n| !n.is_empty()) {
            self.filename = name;
        }
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_status(mut self, status: ThoughtStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    fn header_metadata(&self) -> HeaderMetadata<'_> {
        HeaderMetadata {
            origin_hydra: &self.origin,
            intent: &self.intent,
            priority: self.priority,
            timestamp: &self.timestamp,
            version: &self.version,
            status: self.status,
            node_id: &self.node_tag,
            parent_gist: self.parent_id.as_deref(),
        }
    }

    /// Render the metadata block.
    ///
    /// JSON thoughts get a single document holding both metadata and content;
    /// everything else gets a `---` delimited header ending in a newline.
    pub fn render_metadata_header(&self) -> Result<String> {
        let metadata = self.header_metadata();

        if self.format == ContentFormat::Json {
            let doc = EmbeddedDocument {
                metadata,
                content: &self.content,
            };
            return Ok(serde_json::to_string_pretty(&doc)?);
        }

        let mut lines = vec![HEADER_DELIMITER.to_string(), HEADER_TITLE.to_string()];
        let mut push = |key: &str, value: Value| lines.push(format!("{}: {}", key, value));
        push("origin_hydra", json!(metadata.origin_hydra));
        push("intent", json!(metadata.intent));
        push("priority", json!(metadata.priority));
        push("timestamp", json!(metadata.timestamp));
        push("version", json!(metadata.version));
        push("status", json!(metadata.status));
        push("node_id", json!(metadata.node_id));
        if let Some(parent) = metadata.parent_gist {
            push("parent_gist", json!(parent));
        }
        lines.push(HEADER_DELIMITER.to_string());
        lines.push(String::new());
        Ok(lines.join("\n"))
    }

    /// Full hosted body: header plus content, or the embedded JSON document
    pub fn full_content(&self) -> Result<String> {
        let header = self.render_metadata_header()?;
        if self.format == ContentFormat::Json {
            Ok(header)
        } else {
            Ok(header + &self.content)
        }
    }

    /// Payload for a document host: private, one file keyed by filename
    pub fn to_remote_format(&self) -> Result<RemoteDocument> {
        let mut files = BTreeMap::new();
        files.insert(
            self.filename.clone(),
            RemoteFile {
                filename: None,
                content: self.full_content()?,
            },
        );
        Ok(RemoteDocument {
            description: format!("{} | Hydra: {}", self.intent, self.origin),
            public: false,
            files,
        })
    }

    /// Derive a successor thought.
    ///
    /// The successor keeps origin, priority and format, points at this thought as
    /// its parent and starts in `evolving`. This thought is left untouched; the
    /// index marks it complete once the successor is recorded.
    pub fn evolve(&self, new_content: Option<String>, new_intent: Option<String>) -> ThoughtNode {
        let intent = new_intent.unwrap_or_else(|| self.intent.clone());
        let content = new_content.unwrap_or_else(|| self.content.clone());

        let mut evolved = ThoughtNode::new(
            self.origin.clone(),
            intent,
            self.priority as i64,
            content,
            self.format,
        )
        .with_version(bump_version(&self.version))
        .with_status(ThoughtStatus::Evolving);
        evolved.parent_id = self.id.clone();
        evolved
    }

    /// Update status from a string, rejecting anything outside the known set
    pub fn update_status(&mut self, new_status: &str) -> Result<()> {
        let status = new_status.parse()?;
        self.set_status(status);
        Ok(())
    }

    pub fn set_status(&mut self, status: ThoughtStatus) {
        self.status = status;
        self.timestamp = now_timestamp();
    }

    /// Rebuild a thought from a hosted document.
    ///
    /// Missing metadata falls back to defaults: origin `unknown`, intent from the
    /// document description, priority 5, version `1.0.0`, status `new`.
    pub fn from_remote(gist: &RemoteGist) -> Result<ThoughtNode> {
        let (key, file) = gist.files.iter().next().ok_or_else(|| GhostError::MalformedDocument {
            id: gist.id.clone(),
            reason: "document has no files".to_string(),
        })?;
        let filename = file.filename.clone().unwrap_or_else(|| key.clone());

        let shape = classify_document(&file.content).ok_or_else(|| GhostError::MalformedDocument {
            id: gist.id.clone(),
            reason: "embedded JSON body does not decode".to_string(),
        })?;

        let (metadata, body, shape_format) = match shape {
            DocumentShape::Header { metadata, body } => (metadata, body, None),
            DocumentShape::Embedded { metadata, body } => {
                (metadata, body, Some(ContentFormat::Json))
            }
            DocumentShape::Plain { body } => (Map::new(), body, None),
        };

        let format = metadata_str(&metadata, "file_format")
            .map(|tag| ContentFormat::from_tag_lossy(&tag))
            .or(shape_format)
            .or_else(|| ContentFormat::from_filename(&filename))
            .unwrap_or_default();

        let intent = metadata_str(&metadata, "intent")
            .or_else(|| gist.description.clone())
            .unwrap_or_else(|| "Unknown intent".to_string());

        // An unrecognized status in a hosted document is not fatal
        let status = metadata_str(&metadata, "status")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let timestamp = metadata_str(&metadata, "timestamp")
            .or_else(|| gist.created_at.clone())
            .unwrap_or_else(now_timestamp);

        let mut node = ThoughtNode::new(
            metadata_str(&metadata, "origin_hydra").unwrap_or_else(default_origin),
            intent,
            metadata_priority(&metadata),
            body,
            format,
        )
        .with_id(gist.id.clone())
        .with_filename(Some(filename))
        .with_version(metadata_str(&metadata, "version").unwrap_or_else(default_version))
        .with_status(status)
        .with_timestamp(timestamp);

        node.parent_id = metadata_str(&metadata, "parent_gist");
        if let Some(tag) = metadata_str(&metadata, "node_id") {
            node.node_tag = tag;
        }
        Ok(node)
    }
}

impl fmt::Display for ThoughtNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Thought({}): {} [{}]",
            self.id.as_deref().unwrap_or("new"),
            self.intent,
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(format: ContentFormat) -> ThoughtNode {
        ThoughtNode::new("node-a", "Market research", 7, "Analysis of X", format)
            .with_id("g1")
            .with_timestamp("2025-01-01T00:00:00.000000Z")
    }

    fn remote(id: &str, filename: &str, content: &str) -> RemoteGist {
        let mut files = BTreeMap::new();
        files.insert(
            filename.to_string(),
            RemoteFile {
                filename: Some(filename.to_string()),
                content: content.to_string(),
            },
        );
        RemoteGist {
            id: id.to_string(),
            description: Some("From the host".to_string()),
            created_at: Some("2024-06-01T00:00:00Z".to_string()),
            files,
        }
    }

    // --- Construction ---

    #[test]
    fn test_priority_clamped() {
        assert_eq!(ThoughtNode::new("o", "i", -5, "", ContentFormat::Markdown).priority, 1);
        assert_eq!(ThoughtNode::new("o", "i", 15, "", ContentFormat::Markdown).priority, 10);
        assert_eq!(ThoughtNode::new("o", "i", 7, "", ContentFormat::Markdown).priority, 7);
    }

    #[test]
    fn test_new_defaults() {
        let node = ThoughtNode::new("o", "Some intent", 5, "body", ContentFormat::Plain);
        assert_eq!(node.id, None);
        assert_eq!(node.status, ThoughtStatus::New);
        assert_eq!(node.version, "1.0.0");
        assert_eq!(node.filename, "some_intent_thought.txt");
        assert!(node.timestamp.ends_with('Z'));
        assert!(!node.node_tag.is_empty());
    }

    #[test]
    fn test_node_tags_unique() {
        let a = ThoughtNode::new("o", "i", 5, "", ContentFormat::Markdown);
        let b = ThoughtNode::new("o", "i", 5, "", ContentFormat::Markdown);
        assert_ne!(a.node_tag, b.node_tag);
    }

    #[test]
    fn test_derive_filename() {
        assert_eq!(
            derive_filename("Market Research: Q3!", ContentFormat::Markdown),
            "market_research_q3_thought.md"
        );
        assert_eq!(derive_filename("data-set_v2", ContentFormat::Json), "data-set_v2_thought.json");
        let long = "a".repeat(80);
        assert_eq!(
            derive_filename(&long, ContentFormat::Plain),
            format!("{}_thought.txt", "a".repeat(50))
        );
    }

    #[test]
    fn test_explicit_filename_wins() {
        let node = ThoughtNode::new("o", "intent", 5, "", ContentFormat::Markdown)
            .with_filename(Some("custom.md".to_string()));
        assert_eq!(node.filename, "custom.md");
    }

    #[test]
    fn test_format_lossy_defaults_to_markdown() {
        assert_eq!(ContentFormat::from_tag_lossy("yaml"), ContentFormat::Markdown);
        assert_eq!(ContentFormat::from_tag_lossy("json"), ContentFormat::Json);
        assert!("yaml".parse::<ContentFormat>().is_err());
    }

    // --- Versions and evolution ---

    #[test]
    fn test_bump_version() {
        assert_eq!(bump_version("1.2.3"), "1.3.0");
        assert_eq!(bump_version("1.0"), "1.1.0");
        assert_eq!(bump_version("1.x.0"), "1.1.0");
        assert_eq!(bump_version("2.9.9"), "2.10.0");
    }

    #[test]
    fn test_evolve() {
        let parent = sample(ContentFormat::Markdown).with_version("1.2.3");
        let child = parent.evolve(Some("Updated".to_string()), None);

        assert_eq!(child.parent_id.as_deref(), Some("g1"));
        assert_eq!(child.version, "1.3.0");
        assert_eq!(child.status, ThoughtStatus::Evolving);
        assert_eq!(child.origin, parent.origin);
        assert_eq!(child.priority, parent.priority);
        assert_eq!(child.intent, parent.intent);
        assert_eq!(child.content, "Updated");
        assert_eq!(child.id, None);
        assert_ne!(child.node_tag, parent.node_tag);
        // The original is not touched
        assert_eq!(parent.status, ThoughtStatus::New);
    }

    #[test]
    fn test_evolve_malformed_version() {
        let parent = sample(ContentFormat::Markdown).with_version("1.0");
        let child = parent.evolve(None, Some("New direction".to_string()));
        assert_eq!(child.version, "1.1.0");
        assert_eq!(child.intent, "New direction");
        assert_eq!(child.content, parent.content);
        assert_eq!(child.filename, "new_direction_thought.md");
    }

    // --- Status ---

    #[test]
    fn test_update_status() {
        let mut node = sample(ContentFormat::Markdown);
        node.update_status("processing").unwrap();
        assert_eq!(node.status, ThoughtStatus::Processing);
        assert_ne!(node.timestamp, "2025-01-01T00:00:00.000000Z");

        let err = node.update_status("archived").unwrap_err();
        assert!(matches!(err, GhostError::InvalidStatus(ref s) if s == "archived"));
        assert_eq!(node.status, ThoughtStatus::Processing);
    }

    // --- Rendering ---

    #[test]
    fn test_markdown_header() {
        let node = sample(ContentFormat::Markdown).with_parent("g0");
        let header = node.render_metadata_header().unwrap();
        let lines: Vec<&str> = header.split('\n').collect();

        assert_eq!(lines[0], "---");
        assert_eq!(lines[1], "# Hydra Network Metadata");
        assert_eq!(lines[2], "origin_hydra: \"node-a\"");
        assert_eq!(lines[4], "priority: 7");
        assert_eq!(lines[7], "status: \"new\"");
        assert_eq!(lines[9], "parent_gist: \"g0\"");
        assert_eq!(lines[10], "---");
        assert!(header.ends_with("---\n"));

        let full = node.full_content().unwrap();
        assert!(full.ends_with("---\nAnalysis of X"));
    }

    #[test]
    fn test_json_embeds_content() {
        let node = sample(ContentFormat::Json);
        let full = node.full_content().unwrap();
        assert_eq!(full, node.render_metadata_header().unwrap());

        let value: Value = serde_json::from_str(&full).unwrap();
        assert_eq!(value["content"], "Analysis of X");
        assert_eq!(value["metadata"]["intent"], "Market research");
        assert!(value["metadata"].get("parent_gist").is_none());
    }

    #[test]
    fn test_to_remote_format() {
        let node = sample(ContentFormat::Markdown);
        let doc = node.to_remote_format().unwrap();
        assert_eq!(doc.description, "Market research | Hydra: node-a");
        assert!(!doc.public);
        assert_eq!(doc.files.len(), 1);
        let file = &doc.files["market_research_thought.md"];
        assert_eq!(file.content, node.full_content().unwrap());
    }

    // --- Parsing hosted documents ---

    #[test]
    fn test_classify_shapes() {
        assert!(matches!(
            classify_document("---\na: 1\n---\nbody"),
            Some(DocumentShape::Header { .. })
        ));
        assert!(matches!(
            classify_document("  {\"content\": \"x\"}"),
            Some(DocumentShape::Embedded { .. })
        ));
        assert!(matches!(classify_document("just text"), Some(DocumentShape::Plain { .. })));
        assert_eq!(classify_document("{not json"), None);
    }

    #[test]
    fn test_from_remote_header() {
        let original = sample(ContentFormat::Markdown).with_parent("g0").with_version("1.4.0");
        let gist = remote("g1", &original.filename, &original.full_content().unwrap());

        let parsed = ThoughtNode::from_remote(&gist).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_from_remote_embedded_json() {
        let original = sample(ContentFormat::Json);
        let gist = remote("g1", &original.filename, &original.full_content().unwrap());

        let parsed = ThoughtNode::from_remote(&gist).unwrap();
        assert_eq!(parsed.format, ContentFormat::Json);
        assert_eq!(parsed.content, "Analysis of X");
        assert_eq!(parsed.intent, "Market research");
        assert_eq!(parsed.node_tag, original.node_tag);
    }

    #[test]
    fn test_from_remote_plain_defaults() {
        let gist = remote("g9", "notes.txt", "no metadata here");
        let parsed = ThoughtNode::from_remote(&gist).unwrap();

        assert_eq!(parsed.id.as_deref(), Some("g9"));
        assert_eq!(parsed.origin, "unknown");
        assert_eq!(parsed.intent, "From the host");
        assert_eq!(parsed.priority, 5);
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.status, ThoughtStatus::New);
        assert_eq!(parsed.format, ContentFormat::Plain);
        assert_eq!(parsed.timestamp, "2024-06-01T00:00:00Z");
        assert_eq!(parsed.content, "no metadata here");
    }

    #[test]
    fn test_from_remote_malformed_header_values() {
        let content = "---\norigin_hydra: bare-origin\npriority: 42\nstatus: \"weird\"\n---\nbody";
        let parsed = ThoughtNode::from_remote(&remote("g2", "x.md", content)).unwrap();
        assert_eq!(parsed.origin, "bare-origin");
        assert_eq!(parsed.priority, 10);
        assert_eq!(parsed.status, ThoughtStatus::New);
        assert_eq!(parsed.content, "body");
    }

    #[test]
    fn test_from_remote_rejects_empty_and_broken() {
        let empty = RemoteGist {
            id: "g3".to_string(),
            description: None,
            created_at: None,
            files: BTreeMap::new(),
        };
        assert!(matches!(
            ThoughtNode::from_remote(&empty),
            Err(GhostError::MalformedDocument { .. })
        ));
        assert!(ThoughtNode::from_remote(&remote("g4", "x.json", "{broken")).is_err());
    }

    #[test]
    fn test_record_round_trip_keys() {
        let node = sample(ContentFormat::Markdown);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["gist_id"], "g1");
        assert_eq!(value["origin_hydra"], "node-a");
        assert_eq!(value["file_format"], "md");
        assert!(value["parent_gist"].is_null());
        let back: ThoughtNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    proptest! {
        #[test]
        fn prop_priority_always_in_range(p in any::<i64>()) {
            let node = ThoughtNode::new("o", "i", p, "", ContentFormat::Markdown);
            prop_assert!((MIN_PRIORITY..=MAX_PRIORITY).contains(&node.priority));
            if (1..=10).contains(&p) {
                prop_assert_eq!(node.priority as i64, p);
            }
        }

        #[test]
        fn prop_filename_is_safe(intent in ".{0,120}") {
            let name = derive_filename(&intent, ContentFormat::Markdown);
            prop_assert!(name.ends_with("_thought.md"));
            let stem = name.trim_end_matches("_thought.md");
            prop_assert!(stem.chars().count() <= 50);
            prop_assert!(stem.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
