//! GistGhost - local thought-network index for the Hydra network
//!
//! Track every thought, its lineage, and the links between them, independent of
//! the service that hosts the thought documents.
//!
//! # Overview
//!
//! A [`ThoughtNode`] is one unit of content plus its network metadata. Once a
//! host has assigned it an id, it is registered with the [`GraphIndex`], which
//! keeps every known thought, the typed edges between them, and persists the
//! whole state to a single JSON snapshot after every change.
//!
//! # Statuses
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `new` | Just created |
//! | `processing` | Being worked on |
//! | `complete` | Superseded or finished |
//! | `evolving` | A successor that is still developing |
//!
//! # Quick Start
//!
//! ```no_run
//! use gistghost::{ContentFormat, GraphIndex, ThoughtNode};
//!
//! let mut index = GraphIndex::open(".gistghost/index.json");
//!
//! // A host assigned the id "abc123"
//! let format = ContentFormat::Markdown;
//! let guide = ThoughtNode::new("my-hydra", "Write the guide", 9, "# Guide", format)
//!     .with_id("abc123");
//! index.add_node(guide.clone()).unwrap();
//!
//! // Evolve it; the index records the lineage
//! let v2 = guide.evolve(Some("# Guide v2".to_string()), None).with_id("def456");
//! index.commit_evolution("abc123", v2).unwrap();
//!
//! let stats = index.network_stats();
//! println!("Thoughts: {}, chains: {}", stats.total_thoughts, stats.evolution_chains);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod ghost;
pub mod index;
pub mod remote;
pub mod thought;

pub use config::Config;
pub use error::{GhostError, Result};
pub use export::{snapshot_to_dot, DotConfig, ExportFormat};
pub use ghost::Ghost;
pub use index::{
    Edge, GraphIndex, IndexMetadata, NetworkStats, RelatedThought, SearchField, Snapshot,
    DEFAULT_RELATIONSHIP, EVOLVED_FROM, EVOLVED_TO,
};
pub use remote::{DirectoryHost, RemoteHost, RemoteRecord};
pub use thought::{
    classify_document, ContentFormat, DocumentShape, RemoteDocument, RemoteFile, RemoteGist,
    ThoughtNode, ThoughtStatus,
};

// Re-export TS trait for downstream use
#[cfg(feature = "ts-rs")]
pub use ts_rs::TS;
