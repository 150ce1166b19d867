//! JSON workspace file used by the command-line tool
//!
//! Holds the registered invoices and a snapshot of the transition repository.
//! Each command loads the file, works against an in-memory repository, and
//! saves the result back. Writers hold a [`WorkspaceLock`] from load to save,
//! so a second writer fails instead of overwriting the first one's changes.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fd_lock::{RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assignment::TaskAssigner;
use crate::errors::{Result, WorkflowError};
use crate::invoice::{IncomingInvoice, IncomingInvoiceTransitionType};
use crate::observability::OperationTimer;
use crate::store::memory::{InMemoryTransitionRepository, RepositorySnapshot};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    invoices: BTreeMap<String, IncomingInvoice>,
    #[serde(default)]
    repository: RepositorySnapshot<IncomingInvoiceTransitionType>,
}

/// Held while a workspace is read, changed and saved
pub type WorkspaceGuard<'a> = RwLockWriteGuard<'a, File>;

/// Exclusive lock file kept beside the workspace file
pub struct WorkspaceLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn open(workspace_path: &Path) -> Result<Self> {
        if let Some(parent) = workspace_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let path = workspace_path.with_extension("lock");
        let file = File::create(&path)?;
        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    /// Take the lock without waiting; fails if another writer holds it
    pub fn try_acquire(&mut self) -> Result<WorkspaceGuard<'_>> {
        let path = &self.path;
        self.lock.try_write().map_err(|err| {
            debug!(path = %path.display(), error = %err, "Workspace lock is held elsewhere");
            WorkflowError::WorkspaceLocked(path.display().to_string())
        })
    }
}

/// Invoices plus their transition history, loaded from one file
pub struct InvoiceWorkspace {
    invoices: BTreeMap<String, IncomingInvoice>,
    repository: Arc<InMemoryTransitionRepository<IncomingInvoiceTransitionType>>,
}

impl InvoiceWorkspace {
    pub fn empty(assigner: TaskAssigner) -> Self {
        Self {
            invoices: BTreeMap::new(),
            repository: Arc::new(InMemoryTransitionRepository::new(assigner)),
        }
    }

    /// Load the workspace at `path`; a missing file is an empty workspace
    pub async fn load(path: &Path, assigner: TaskAssigner) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!(path = %path.display(), "No workspace file yet, starting empty");
            return Ok(Self::empty(assigner));
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let file: WorkspaceFile = serde_json::from_str(&contents)?;
        let repository = InMemoryTransitionRepository::from_snapshot(file.repository, assigner)?;

        debug!(
            path = %path.display(),
            invoices = file.invoices.len(),
            "Workspace loaded"
        );
        Ok(Self {
            invoices: file.invoices,
            repository: Arc::new(repository),
        })
    }

    /// Write the workspace to `path`, replacing the previous file
    pub async fn save(&self, path: &Path, _held: &WorkspaceGuard<'_>) -> Result<()> {
        let timer = OperationTimer::new("workspace_save");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = WorkspaceFile {
            invoices: self.invoices.clone(),
            repository: self.repository.snapshot().await,
        };
        let contents = serde_json::to_string_pretty(&file)?;

        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, contents).await?;
        tokio::fs::rename(&staging, path).await?;

        info!(path = %path.display(), "Workspace saved");
        timer.finish();
        Ok(())
    }

    pub fn repository(&self) -> Arc<InMemoryTransitionRepository<IncomingInvoiceTransitionType>> {
        Arc::clone(&self.repository)
    }

    /// Add an invoice; references are unique within a workspace
    pub fn register(&mut self, invoice: IncomingInvoice) -> Result<()> {
        if self.invoices.contains_key(&invoice.reference) {
            return Err(WorkflowError::AlreadyRegistered(invoice.reference));
        }
        self.invoices.insert(invoice.reference.clone(), invoice);
        Ok(())
    }

    pub fn invoice(&self, reference: &str) -> Result<&IncomingInvoice> {
        self.invoices
            .get(reference)
            .ok_or_else(|| WorkflowError::UnknownName {
                kind: "invoice",
                name: reference.to_string(),
            })
    }

    pub fn invoice_mut(&mut self, reference: &str) -> Result<&mut IncomingInvoice> {
        self.invoices
            .get_mut(reference)
            .ok_or_else(|| WorkflowError::UnknownName {
                kind: "invoice",
                name: reference.to_string(),
            })
    }

    pub fn invoices(&self) -> impl Iterator<Item = &IncomingInvoice> {
        self.invoices.values()
    }
}
