use std::fs;
use std::path::PathBuf;

use ahash::AHashSet;
use thiserror::Error;

use crate::models::{BlacklistData, Target};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("blacklist io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blacklist serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable set of banned identities, keyed both by numeric id and by
/// lowercased handle. Handles are mutable on the platform side, so the dual
/// keying catches identities that rotate their handle after a ban.
pub struct BlacklistStore {
    path: PathBuf,
    ids: AHashSet<u64>,
    handles: AHashSet<String>,
}

impl BlacklistStore {
    /// Loads the store from `path`. A missing or unreadable file yields an
    /// empty blacklist; moderation must start either way.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BlacklistData>(&raw) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!(
                        "blacklist file {} is corrupt, starting empty: {e}",
                        path.display()
                    );
                    BlacklistData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BlacklistData::default(),
            Err(e) => {
                log::warn!(
                    "blacklist file {} is unreadable, starting empty: {e}",
                    path.display()
                );
                BlacklistData::default()
            }
        };

        let ids: AHashSet<u64> = data.user_ids.into_iter().collect();
        let handles: AHashSet<String> = data
            .usernames
            .into_iter()
            .map(|h| h.to_lowercase())
            .collect();
        log::info!(
            "blacklist loaded: {} ids, {} handles",
            ids.len(),
            handles.len()
        );

        Self { path, ids, handles }
    }

    /// Rewrites the whole file: serialize to a sibling temp file, then rename
    /// over the target so a crash mid-write never truncates existing state.
    pub fn save(&self) -> Result<(), StoreError> {
        let (user_ids, usernames) = self.snapshot();
        let data = BlacklistData { user_ids, usernames };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// True if the identity matches by numeric id or by lowercased handle.
    pub fn contains(&self, id: u64, handle: Option<&str>) -> bool {
        self.ids.contains(&id)
            || handle.map_or(false, |h| self.handles.contains(&h.to_lowercase()))
    }

    /// Inserts the target into the in-memory sets. Returns true if anything
    /// changed; the caller persists afterward.
    pub fn add(&mut self, target: &Target) -> bool {
        match target {
            Target::Id(id) => self.ids.insert(*id),
            Target::Handle(h) => self.handles.insert(h.to_lowercase()),
            Target::User { id, handle } => {
                let added_id = self.ids.insert(*id);
                let added_handle = handle
                    .as_deref()
                    .map_or(false, |h| self.handles.insert(h.to_lowercase()));
                added_id || added_handle
            }
        }
    }

    /// Removes the target from the in-memory sets. Removing an absent entry
    /// is a no-op; returns true if anything was actually removed.
    pub fn remove(&mut self, target: &Target) -> bool {
        match target {
            Target::Id(id) => self.ids.remove(id),
            Target::Handle(h) => self.handles.remove(&h.to_lowercase()),
            Target::User { id, handle } => {
                let removed_id = self.ids.remove(id);
                let removed_handle = handle
                    .as_deref()
                    .map_or(false, |h| self.handles.remove(&h.to_lowercase()));
                removed_id || removed_handle
            }
        }
    }

    /// Sorted copies of both sets, for persistence and listing.
    pub fn snapshot(&self) -> (Vec<u64>, Vec<String>) {
        let mut ids: Vec<u64> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        let mut handles: Vec<String> = self.handles.iter().cloned().collect();
        handles.sort();
        (ids, handles)
    }
}
