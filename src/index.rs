//! File-backed graph index of thoughts and their relationships
//!
//! The index owns every locally known thought, the directed typed edges between
//! them, and a small metadata block. The whole state is one [`Snapshot`] that is
//! rewritten atomically after every mutation.
//!
//! Relationship conventions:
//!
//! | Type | Meaning |
//! |------|---------|
//! | `evolved_to` | parent -> successor |
//! | `evolved_from` | successor -> parent |
//! | `<type>` | general link, as given by the caller (default `related`) |
//! | `reverse_<type>` | the reciprocal side of a general link |

use crate::error::{GhostError, Result};
use crate::export::{self, DotConfig, ExportFormat};
use crate::thought::{now_timestamp, ThoughtNode, ThoughtStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[cfg(feature = "ts-rs")]
use ts_rs::TS;

pub const EVOLVED_TO: &str = "evolved_to";
pub const EVOLVED_FROM: &str = "evolved_from";
pub const DEFAULT_RELATIONSHIP: &str = "related";
pub const REVERSE_PREFIX: &str = "reverse_";
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Name of the reciprocal edge type for a general link
pub fn reverse_relationship(relationship: &str) -> String {
    format!("{}{}", REVERSE_PREFIX, relationship)
}

fn is_evolution(relationship: &str) -> bool {
    relationship == EVOLVED_TO || relationship == EVOLVED_FROM
}

/// One directed, typed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
pub struct Edge {
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
}

/// Snapshot bookkeeping; counters are recomputed on save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
#[serde(default)]
pub struct IndexMetadata {
    pub version: String,
    pub created_at: String,
    pub last_updated: String,
    pub total_thoughts: usize,
    pub evolution_chains: usize,
}

impl Default for IndexMetadata {
    fn default() -> Self {
        let now = now_timestamp();
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            created_at: now.clone(),
            last_updated: now,
            total_thoughts: 0,
            evolution_chains: 0,
        }
    }
}

/// Complete serialized state of the index.
///
/// Missing sections decode to empty defaults so older files keep loading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub thoughts: BTreeMap<String, ThoughtNode>,
    pub relationships: BTreeMap<String, Vec<Edge>>,
    pub metadata: IndexMetadata,
}

impl Snapshot {
    /// Decode a snapshot file
    pub fn read(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| GhostError::persistence(path, e))?;
        serde_json::from_str(&content).map_err(|source| GhostError::CorruptSnapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the snapshot atomically: temp file, fsync, rename into place
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GhostError::persistence(parent, e))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut file =
                std::fs::File::create(&tmp).map_err(|e| GhostError::persistence(&tmp, e))?;
            file.write_all(content.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| GhostError::persistence(&tmp, e))?;
        }
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            GhostError::persistence(path, e)
        })
    }
}

/// Move an undecodable snapshot to `<file>.corrupt`
fn quarantine(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    let aside = PathBuf::from(aside);
    match std::fs::rename(path, &aside) {
        Ok(()) => warn!(path = %aside.display(), "unreadable index moved aside"),
        Err(e) => warn!(error = %e, "could not move unreadable index aside"),
    }
}

/// A neighbour of a thought, as seen through one outgoing edge
#[derive(Debug, Clone, Serialize)]
pub struct RelatedThought<'a> {
    pub thought: &'a ThoughtNode,
    pub relationship: &'a str,
    pub created_at: &'a str,
}

/// Aggregate numbers over the whole network
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "ts-rs", derive(TS))]
pub struct NetworkStats {
    pub total_thoughts: usize,
    /// `new` + `processing`
    pub active_thoughts: usize,
    pub completed_thoughts: usize,
    pub evolving_thoughts: usize,
    pub evolution_chains: usize,
    pub semantic_links: usize,
    pub status_breakdown: BTreeMap<String, usize>,
    pub avg_chain_length: f64,
}

/// Fields a search can look at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Intent,
    Content,
    Origin,
}

impl SearchField {
    pub const DEFAULT: [SearchField; 3] =
        [SearchField::Intent, SearchField::Content, SearchField::Origin];

    fn value<'a>(&self, thought: &'a ThoughtNode) -> &'a str {
        match self {
            SearchField::Intent => &thought.intent,
            SearchField::Content => &thought.content,
            SearchField::Origin => &thought.origin,
        }
    }
}

impl std::str::FromStr for SearchField {
    type Err = GhostError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "intent" => Ok(SearchField::Intent),
            "content" => Ok(SearchField::Content),
            "origin" | "origin_hydra" => Ok(SearchField::Origin),
            other => Err(GhostError::UnsupportedFormat(format!("search field '{}'", other))),
        }
    }
}

/// The local graph index bound to one snapshot file
#[derive(Debug)]
pub struct GraphIndex {
    path: PathBuf,
    snapshot: Snapshot,
}

impl GraphIndex {
    /// Open the index at `path`.
    ///
    /// A missing file yields an empty index. A file that cannot be read or
    /// decoded is logged and also yields an empty index; an undecodable file is
    /// first moved aside to `<file>.corrupt` so the next save cannot clobber it.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            match Snapshot::read(&path) {
                Ok(snapshot) => snapshot,
                Err(e @ GhostError::CorruptSnapshot { .. }) => {
                    warn!(error = %e, "could not decode index, starting empty");
                    quarantine(&path);
                    Snapshot::default()
                }
                Err(e) => {
                    warn!(error = %e, "could not load index, starting empty");
                    Snapshot::default()
                }
            }
        } else {
            Snapshot::default()
        };
        Self { path, snapshot }
    }

    /// Build an index from an exported JSON snapshot, bound to `path`
    pub fn from_json<P: AsRef<Path>>(path: P, json: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = serde_json::from_str(json).map_err(|source| GhostError::CorruptSnapshot {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, snapshot })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn len(&self) -> usize {
        self.snapshot.thoughts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.thoughts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot.thoughts.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ThoughtNode> {
        self.snapshot.thoughts.get(id)
    }

    /// Outgoing edges of `id`, in insertion order
    pub fn edges_from(&self, id: &str) -> &[Edge] {
        self.snapshot
            .relationships
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Refresh derived counters and write the full snapshot
    pub fn save(&mut self) -> Result<()> {
        let evolution_chains = self.evolution_chains().len();
        let metadata = &mut self.snapshot.metadata;
        metadata.last_updated = now_timestamp();
        metadata.total_thoughts = self.snapshot.thoughts.len();
        metadata.evolution_chains = evolution_chains;

        if let Err(e) = self.snapshot.write(&self.path) {
            warn!(error = %e, "could not save index; memory and disk now differ");
            return Err(e);
        }
        debug!(
            path = %self.path.display(),
            thoughts = self.snapshot.metadata.total_thoughts,
            "index saved"
        );
        Ok(())
    }

    /// Store a thought and record the lineage edges to and from indexed relatives.
    ///
    /// Lineage to a parent that is not indexed yet is deferred: the edges are
    /// added when that parent arrives.
    fn insert_thought(&mut self, thought: ThoughtNode) -> Result<()> {
        let id = thought.id.clone().ok_or(GhostError::MissingIdentifier)?;
        let parent = thought.parent_id.clone().filter(|parent| *parent != id);
        self.snapshot.thoughts.insert(id.clone(), thought);

        if let Some(parent) = parent {
            if self.contains(&parent) {
                self.add_lineage(&parent, &id);
            } else {
                warn!(id = %id, parent = %parent, "parent not indexed, lineage deferred");
            }
        }

        let orphans: Vec<String> = self
            .snapshot
            .thoughts
            .iter()
            .filter(|(child, t)| **child != id && t.parent_id.as_deref() == Some(id.as_str()))
            .map(|(child, _)| child.clone())
            .collect();
        for child in orphans {
            self.add_lineage(&id, &child);
        }
        Ok(())
    }

    fn add_lineage(&mut self, parent: &str, child: &str) {
        self.add_edge(parent, child, EVOLVED_TO);
        self.add_edge(child, parent, EVOLVED_FROM);
    }

    /// Store a published thought, recording its lineage if it has a parent
    pub fn add_node(&mut self, thought: ThoughtNode) -> Result<()> {
        self.insert_thought(thought)?;
        self.save()
    }

    /// Overwrite an already indexed thought
    pub fn update_node(&mut self, thought: ThoughtNode) -> Result<()> {
        let id = thought.id.clone().ok_or(GhostError::MissingIdentifier)?;
        match self.snapshot.thoughts.get_mut(&id) {
            Some(stored) => *stored = thought,
            None => {
                warn!(id = %id, "thought not found in index, update skipped");
                return Err(GhostError::NotFound(id));
            }
        }
        self.save()
    }

    /// Change the status of an indexed thought
    pub fn set_status(&mut self, id: &str, status: ThoughtStatus) -> Result<()> {
        let thought = self
            .snapshot
            .thoughts
            .get_mut(id)
            .ok_or_else(|| GhostError::NotFound(id.to_string()))?;
        thought.set_status(status);
        self.save()
    }

    /// Record a successor: mark the parent complete and store the child in one write
    pub fn commit_evolution(&mut self, parent_id: &str, child: ThoughtNode) -> Result<()> {
        if child.id.is_none() {
            return Err(GhostError::MissingIdentifier);
        }
        let parent = self
            .snapshot
            .thoughts
            .get_mut(parent_id)
            .ok_or_else(|| GhostError::NotFound(parent_id.to_string()))?;
        parent.set_status(ThoughtStatus::Complete);

        let child = if child.parent_id.as_deref() == Some(parent_id) {
            child
        } else {
            child.with_parent(parent_id)
        };
        self.insert_thought(child)?;
        self.save()
    }

    /// Remove a thought and every edge that touches it. Prefer evolving over removing.
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        if self.snapshot.thoughts.remove(id).is_none() {
            return Err(GhostError::NotFound(id.to_string()));
        }

        let relationships = &mut self.snapshot.relationships;
        relationships.remove(id);
        for edges in relationships.values_mut() {
            edges.retain(|edge| edge.to != id);
        }
        relationships.retain(|_, edges| !edges.is_empty());

        self.save()
    }

    /// Add one edge unless the same (target, type) already leaves `from`
    fn add_edge(&mut self, from: &str, to: &str, kind: &str) -> bool {
        let edges = self.snapshot.relationships.entry(from.to_string()).or_default();
        if edges.iter().any(|edge| edge.to == to && edge.kind == kind) {
            return false;
        }
        edges.push(Edge {
            to: to.to_string(),
            kind: kind.to_string(),
            created_at: now_timestamp(),
        });
        true
    }

    /// Link two indexed thoughts in both directions (`<type>` and `reverse_<type>`).
    /// Linking the same pair with the same type again changes nothing.
    ///
    /// Lineage types are reserved for evolution and rejected here.
    pub fn link_nodes(&mut self, from: &str, to: &str, relationship: &str) -> Result<()> {
        if relationship.trim().is_empty() || is_evolution(relationship) {
            return Err(GhostError::InvalidRelationship(relationship.to_string()));
        }
        let from_missing = !self.contains(from);
        let to_missing = !self.contains(to);
        if from_missing || to_missing {
            return Err(GhostError::InvalidRelationshipEndpoints {
                from: from.to_string(),
                to: to.to_string(),
                from_missing,
                to_missing,
            });
        }

        let forward = self.add_edge(from, to, relationship);
        let reverse = self.add_edge(to, from, &reverse_relationship(relationship));
        if !forward && !reverse {
            debug!(from, to, relationship, "link already present");
        }
        self.save()
    }

    /// Thoughts newest first, optionally filtered by status
    pub fn list_nodes(&self, status: Option<ThoughtStatus>, limit: usize) -> Vec<&ThoughtNode> {
        let mut thoughts: Vec<&ThoughtNode> = self
            .snapshot
            .thoughts
            .values()
            .filter(|t| status.is_none() || status == Some(t.status))
            .collect();
        thoughts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        thoughts.truncate(limit);
        thoughts
    }

    /// Case-insensitive substring search over the given fields, newest first
    pub fn search_nodes(&self, query: &str, fields: &[SearchField]) -> Vec<&ThoughtNode> {
        let query = query.to_lowercase();
        let mut matches: Vec<&ThoughtNode> = self
            .snapshot
            .thoughts
            .values()
            .filter(|t| {
                fields
                    .iter()
                    .any(|field| field.value(t).to_lowercase().contains(&query))
            })
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matches
    }

    /// Outgoing edges of `id` joined with the thoughts they point at
    pub fn related(&self, id: &str) -> Vec<RelatedThought<'_>> {
        self.edges_from(id)
            .iter()
            .filter_map(|edge| {
                self.get(&edge.to).map(|thought| RelatedThought {
                    thought,
                    relationship: &edge.kind,
                    created_at: &edge.created_at,
                })
            })
            .collect()
    }

    fn first_edge(&self, id: &str, kind: &str) -> Option<&str> {
        self.edges_from(id)
            .iter()
            .find(|edge| edge.kind == kind)
            .map(|edge| edge.to.as_str())
    }

    /// Lineage of `id` from its root to the latest descendant.
    ///
    /// Both walks follow the first matching edge only, so when a thought has
    /// several successors just one branch is reported.
    pub fn evolution_chain(&self, id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut root = id;
        seen.insert(root);
        while let Some(parent) = self.first_edge(root, EVOLVED_FROM) {
            if !seen.insert(parent) {
                break;
            }
            root = parent;
        }

        let mut chain = vec![root.to_string()];
        let mut seen = HashSet::from([root]);
        let mut current = root;
        while let Some(child) = self.first_edge(current, EVOLVED_TO) {
            if !seen.insert(child) {
                break;
            }
            chain.push(child.to_string());
            current = child;
        }
        chain
    }

    /// Every lineage of two or more thoughts, each thought in at most one chain
    pub fn evolution_chains(&self) -> Vec<Vec<String>> {
        let mut chains = Vec::new();
        let mut processed: HashSet<String> = HashSet::new();

        for id in self.snapshot.thoughts.keys() {
            if processed.contains(id) || self.first_edge(id, EVOLVED_FROM).is_some() {
                continue;
            }
            let chain = self.evolution_chain(id);
            if chain.len() > 1 {
                processed.extend(chain.iter().cloned());
                chains.push(chain);
            }
        }
        chains
    }

    pub fn network_stats(&self) -> NetworkStats {
        let mut status_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for thought in self.snapshot.thoughts.values() {
            *status_breakdown.entry(thought.status.to_string()).or_default() += 1;
        }
        let count = |status: ThoughtStatus| {
            status_breakdown
                .get(status.as_str())
                .copied()
                .unwrap_or(0)
        };

        // Each general link is stored as two edges
        let link_edges: usize = self
            .snapshot
            .relationships
            .values()
            .flatten()
            .filter(|edge| !is_evolution(&edge.kind))
            .count();

        let chains = self.evolution_chains();
        let avg_chain_length = if chains.is_empty() {
            0.0
        } else {
            chains.iter().map(Vec::len).sum::<usize>() as f64 / chains.len() as f64
        };

        NetworkStats {
            total_thoughts: self.snapshot.thoughts.len(),
            active_thoughts: count(ThoughtStatus::New) + count(ThoughtStatus::Processing),
            completed_thoughts: count(ThoughtStatus::Complete),
            evolving_thoughts: count(ThoughtStatus::Evolving),
            evolution_chains: chains.len(),
            semantic_links: link_edges / 2,
            avg_chain_length,
            status_breakdown,
        }
    }

    /// Export the network as `json` (full snapshot) or `dot` (Graphviz)
    pub fn export(&self, format: &str) -> Result<String> {
        match format.parse::<ExportFormat>()? {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&self.snapshot)?),
            ExportFormat::Dot => Ok(export::snapshot_to_dot(&self.snapshot, &DotConfig::default())),
        }
    }

    /// Write the current snapshot to `path`
    pub fn backup<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot.write(path.as_ref())
    }

    /// Replace the whole index with a backup and save it to the primary file
    pub fn restore<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GhostError::NotFound(format!(
                "backup file {}",
                path.display()
            )));
        }
        self.snapshot = Snapshot::read(path)?;
        self.save()
    }
}
