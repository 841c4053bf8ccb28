use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tokio::sync::Mutex;

use crate::{domain::UserId, Result};

/// The set of administrators, persisted as a JSON array of ids.
///
/// Memory is authoritative: every mutation rewrites the whole file, and a failed
/// write is logged but never undoes the in-memory change. Each `add`/`remove`
/// and its file write happen under one lock, so two writes never interleave.
/// The lock is per call: a membership check followed by a mutation is two
/// separate critical sections.
pub struct AdminRegistry {
    path: PathBuf,
    admins: Mutex<Vec<UserId>>,
}

impl AdminRegistry {
    /// Load the admin file at `path`.
    ///
    /// A missing or unparsable file is not an error: the registry starts from
    /// `seed` instead, and writes it out straight away when it is non-empty.
    pub fn load(path: impl Into<PathBuf>, seed: &[UserId]) -> Self {
        let path = path.into();

        let admins = match read_admin_file(&path) {
            Ok(admins) => {
                tracing::info!(path = %path.display(), count = admins.len(), "admin registry loaded");
                admins
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not load admin file, using seed admins"
                );
                let admins = dedup(seed.iter().copied());
                if !admins.is_empty() {
                    persist(&path, &admins);
                    tracing::info!(count = admins.len(), "admin registry created from seed");
                }
                admins
            }
        };

        Self {
            path,
            admins: Mutex::new(admins),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current admins, in insertion order.
    pub async fn list(&self) -> Vec<UserId> {
        self.admins.lock().await.clone()
    }

    pub async fn is_member(&self, id: UserId) -> bool {
        self.admins.lock().await.contains(&id)
    }

    /// Add `id`. Returns `false` (and writes nothing) if it was already present.
    pub async fn add(&self, id: UserId) -> bool {
        let mut admins = self.admins.lock().await;
        if admins.contains(&id) {
            return false;
        }

        admins.push(id);
        persist_async(&self.path, &admins).await;
        tracing::info!(admin_id = id.0, action = "add", "admin updated");
        true
    }

    /// Remove `id` if present. The file is rewritten either way.
    pub async fn remove(&self, id: UserId) -> bool {
        let mut admins = self.admins.lock().await;
        let removed = match admins.iter().position(|a| *a == id) {
            Some(idx) => {
                admins.remove(idx);
                true
            }
            None => false,
        };

        persist_async(&self.path, &admins).await;
        tracing::info!(admin_id = id.0, action = "delete", removed, "admin updated");
        removed
    }
}

fn read_admin_file(path: &Path) -> Result<Vec<UserId>> {
    let txt = std::fs::read_to_string(path)?;
    let ids: Vec<UserId> = serde_json::from_str(&txt)?;
    Ok(dedup(ids))
}

fn write_admin_file(path: &Path, admins: &[UserId]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut out, admins)?;
    out.flush()?;
    Ok(())
}

fn persist(path: &Path, admins: &[UserId]) {
    log_persisted(path, write_admin_file(path, admins));
}

async fn write_admin_file_async(path: &Path, admins: &[UserId]) -> Result<()> {
    let bytes = serde_json::to_vec(admins)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Same as `persist`, without blocking the runtime worker.
async fn persist_async(path: &Path, admins: &[UserId]) {
    log_persisted(path, write_admin_file_async(path, admins).await);
}

fn log_persisted(path: &Path, outcome: Result<()>) {
    match outcome {
        Ok(()) => tracing::info!(path = %path.display(), "admin file saved"),
        Err(e) => tracing::error!(path = %path.display(), error = %e, "failed to save admin file"),
    }
}

fn dedup(ids: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
    let mut out: Vec<UserId> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
