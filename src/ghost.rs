//! Publishing workflow: thought -> host -> index
//!
//! [`Ghost`] owns one configuration, one host and one index and runs the
//! multi-step operations that touch more than one of them.

use crate::config::Config;
use crate::error::{GhostError, Result};
use crate::index::GraphIndex;
use crate::remote::{RemoteHost, RemoteRecord};
use crate::thought::{ContentFormat, ThoughtNode, ThoughtStatus};
use tracing::{info, warn};

pub struct Ghost<H: RemoteHost> {
    config: Config,
    host: H,
    index: GraphIndex,
}

impl<H: RemoteHost> Ghost<H> {
    pub fn new(config: Config, host: H, index: GraphIndex) -> Self {
        Self { config, host, index }
    }

    pub fn index(&self) -> &GraphIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut GraphIndex {
        &mut self.index
    }

    /// Create a thought, publish it, and index it under the host's id
    pub fn create_thought(
        &mut self,
        content: &str,
        intent: &str,
        priority: Option<i64>,
        format: ContentFormat,
        filename: Option<String>,
    ) -> Result<(ThoughtNode, RemoteRecord)> {
        let priority = priority.unwrap_or(self.config.node.default_priority);
        let origin = self.config.node.origin.clone();
        let thought =
            ThoughtNode::new(origin, intent, priority, content, format).with_filename(filename);

        let record = self.host.create(&thought.to_remote_format()?)?;
        let thought = thought.with_id(record.id.clone());
        self.index.add_node(thought.clone())?;

        info!(id = %record.id, intent, "created thought");
        Ok((thought, record))
    }

    /// Publish a successor of `id` and mark `id` complete, on the host and locally
    pub fn evolve_thought(
        &mut self,
        id: &str,
        new_content: Option<String>,
        new_intent: Option<String>,
    ) -> Result<(ThoughtNode, RemoteRecord)> {
        let mut parent = self
            .index
            .get(id)
            .cloned()
            .ok_or_else(|| GhostError::NotFound(id.to_string()))?;

        let intent = new_intent.unwrap_or_else(|| format!("Evolution of: {}", parent.intent));
        let evolved = parent.evolve(new_content, Some(intent));

        let record = self.host.create(&evolved.to_remote_format()?)?;
        let evolved = evolved.with_id(record.id.clone());

        parent.set_status(ThoughtStatus::Complete);
        self.host.update(id, &parent.to_remote_format()?)?;

        self.index.commit_evolution(id, evolved.clone())?;

        info!(id = %record.id, parent = id, "evolved thought");
        Ok((evolved, record))
    }

    pub fn link_thoughts(&mut self, from: &str, to: &str, relationship: &str) -> Result<()> {
        self.index.link_nodes(from, to, relationship)
    }

    /// Pull a hosted document into the index. Documents that do not parse are skipped.
    pub fn import_thought(&mut self, id: &str) -> Result<ThoughtNode> {
        let gist = self.host.fetch(id)?;
        let thought = match ThoughtNode::from_remote(&gist) {
            Ok(thought) => thought,
            Err(e) => {
                warn!(id, error = %e, "skipping remote document");
                return Err(e);
            }
        };
        self.index.add_node(thought.clone())?;
        Ok(thought)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::DirectoryHost;
    use crate::thought::RemoteDocument;
    use tempfile::TempDir;

    fn make_ghost(dir: &TempDir) -> Ghost<DirectoryHost> {
        let config = Config::default();
        let host = DirectoryHost::new(dir.path().join("gists"));
        let index = GraphIndex::open(dir.path().join("index.json"));
        Ghost::new(config, host, index)
    }

    #[test]
    fn test_create_thought_uses_config_defaults() {
        let dir = TempDir::new().unwrap();
        let mut ghost = make_ghost(&dir);

        let (thought, record) = ghost
            .create_thought("Analysis", "Market research", None, ContentFormat::Markdown, None)
            .unwrap();

        assert_eq!(thought.id.as_deref(), Some(record.id.as_str()));
        assert_eq!(thought.origin, "gistghost-local");
        assert_eq!(thought.priority, 5);
        assert!(ghost.index().contains(&record.id));
    }

    #[test]
    fn test_evolve_thought_completes_parent_everywhere() {
        let dir = TempDir::new().unwrap();
        let mut ghost = make_ghost(&dir);
        let (parent, _) = ghost
            .create_thought("v1", "Plan", Some(8), ContentFormat::Markdown, None)
            .unwrap();
        let parent_id = parent.id.clone().unwrap();

        let (child, _) = ghost.evolve_thought(&parent_id, None, None).unwrap();
        let child_id = child.id.clone().unwrap();

        assert_eq!(child.intent, "Evolution of: Plan");
        assert_eq!(child.content, "v1");
        assert_eq!(child.priority, 8);
        assert_eq!(ghost.index().get(&parent_id).unwrap().status, ThoughtStatus::Complete);
        assert_eq!(ghost.index().evolution_chain(&child_id), vec![parent_id.clone(), child_id]);

        // The host copy of the parent was updated too
        let hosted = ghost.import_thought(&parent_id).unwrap();
        assert_eq!(hosted.status, ThoughtStatus::Complete);
    }

    #[test]
    fn test_import_skips_malformed_document() {
        let dir = TempDir::new().unwrap();
        let mut ghost = make_ghost(&dir);
        let empty = RemoteDocument {
            description: "no files".to_string(),
            public: false,
            files: Default::default(),
        };
        let record = ghost.host.create(&empty).unwrap();

        assert!(matches!(
            ghost.import_thought(&record.id),
            Err(GhostError::MalformedDocument { .. })
        ));
        assert!(ghost.index().is_empty());
    }

    #[test]
    fn test_import_child_before_parent() {
        let dir = TempDir::new().unwrap();
        let mut ghost = make_ghost(&dir);
        let (parent, _) = ghost
            .create_thought("v1", "Plan", None, ContentFormat::Markdown, None)
            .unwrap();
        let parent_id = parent.id.clone().unwrap();
        let (child, _) = ghost.evolve_thought(&parent_id, None, None).unwrap();
        let child_id = child.id.clone().unwrap();

        // Rebuild a fresh index from the host, child first
        ghost.index = GraphIndex::open(dir.path().join("rebuilt.json"));
        ghost.import_thought(&child_id).unwrap();
        assert!(ghost.index().snapshot().relationships.is_empty());

        ghost.import_thought(&parent_id).unwrap();
        assert_eq!(ghost.index().evolution_chain(&child_id), vec![parent_id, child_id]);
    }

    #[test]
    fn test_evolve_unknown_thought() {
        let dir = TempDir::new().unwrap();
        let mut ghost = make_ghost(&dir);
        assert!(matches!(
            ghost.evolve_thought("missing", None, None),
            Err(GhostError::NotFound(_))
        ));
    }
}
