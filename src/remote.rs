//! Document host seam
//!
//! The index never talks to a hosting service directly. A [`RemoteHost`] takes a
//! rendered [`RemoteDocument`] and hands back the id it assigned; the index uses
//! that id as the thought's key. [`DirectoryHost`] keeps documents as JSON files
//! on disk for offline use and tests.

use crate::error::{GhostError, Result};
use crate::thought::{now_timestamp, RemoteDocument, RemoteFile, RemoteGist};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What a host reports after a create or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A service that stores rendered thought documents
pub trait RemoteHost {
    /// Store a new document and return its assigned id
    fn create(&mut self, document: &RemoteDocument) -> Result<RemoteRecord>;

    /// Replace the document stored under `id`
    fn update(&mut self, id: &str, document: &RemoteDocument) -> Result<RemoteRecord>;

    /// Fetch a stored document
    fn fetch(&self, id: &str) -> Result<RemoteGist>;
}

/// On-disk form of a hosted document
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HostedGist {
    id: String,
    url: String,
    description: String,
    public: bool,
    created_at: String,
    updated_at: String,
    files: BTreeMap<String, RemoteFile>,
}

impl HostedGist {
    fn record(&self) -> RemoteRecord {
        RemoteRecord {
            id: self.id.clone(),
            url: self.url.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Hosts documents as `<dir>/<id>.json`
#[derive(Debug, Clone)]
pub struct DirectoryHost {
    dir: PathBuf,
}

impl DirectoryHost {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read(&self, id: &str) -> Result<HostedGist> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(GhostError::NotFound(id.to_string()));
        }
        let content =
            std::fs::read_to_string(&path).map_err(|e| GhostError::persistence(&path, e))?;
        serde_json::from_str(&content).map_err(|e| GhostError::MalformedDocument {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn write(&self, gist: &HostedGist) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| GhostError::persistence(&self.dir, e))?;
        let path = self.document_path(&gist.id);
        let content = serde_json::to_string_pretty(gist)?;
        std::fs::write(&path, content).map_err(|e| GhostError::persistence(&path, e))
    }

    /// Stored files carry their own name so they parse back without the map key
    fn named_files(document: &RemoteDocument) -> BTreeMap<String, RemoteFile> {
        document
            .files
            .iter()
            .map(|(name, file)| {
                (
                    name.clone(),
                    RemoteFile {
                        filename: Some(name.clone()),
                        content: file.content.clone(),
                    },
                )
            })
            .collect()
    }
}

impl RemoteHost for DirectoryHost {
    fn create(&mut self, document: &RemoteDocument) -> Result<RemoteRecord> {
        let id = Uuid::new_v4().simple().to_string();
        let now = now_timestamp();
        let gist = HostedGist {
            url: format!("file://{}", self.document_path(&id).display()),
            id,
            description: document.description.clone(),
            public: document.public,
            created_at: now.clone(),
            updated_at: now,
            files: Self::named_files(document),
        };
        self.write(&gist)?;
        Ok(gist.record())
    }

    fn update(&mut self, id: &str, document: &RemoteDocument) -> Result<RemoteRecord> {
        let mut gist = self.read(id)?;
        gist.description = document.description.clone();
        gist.public = document.public;
        gist.files = Self::named_files(document);
        gist.updated_at = now_timestamp();
        self.write(&gist)?;
        Ok(gist.record())
    }

    fn fetch(&self, id: &str) -> Result<RemoteGist> {
        let gist = self.read(id)?;
        Ok(RemoteGist {
            id: gist.id,
            description: Some(gist.description),
            created_at: Some(gist.created_at),
            files: gist.files,
        })
    }
}
