use indexmap::map::Entry;
use tracing::{debug, warn};

use super::Workspace;
use crate::domain::Blob;
use crate::error::WorkspaceError;

impl<'p> Workspace<'p> {
    /// Create a local blob, or return the existing local one untouched.
    pub fn create_blob(&mut self, name: &str) -> &Blob {
        match self.blob_map.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                debug!(blob = name, "Blob already exists. Skipping.");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                debug!(blob = name, "Creating blob");
                entry.insert(Blob::new())
            }
        }
    }

    /// Remove a local blob. The parent is never touched.
    pub fn remove_blob(&mut self, name: &str) -> bool {
        if self.blob_map.shift_remove(name).is_some() {
            debug!(blob = name, "Removing blob from this workspace.");
            true
        } else {
            debug!(blob = name, "Blob does not exist. Skipping.");
            false
        }
    }

    /// Resolve a blob locally, then through the parent chain.
    ///
    /// The returned blob may be owned by a parent; writing through it with
    /// `Blob::write` is allowed and leaves ownership where it was.
    pub fn get_blob(&self, name: &str) -> Option<&Blob> {
        if let Some(blob) = self.blob_map.get(name) {
            return Some(blob);
        }
        if let Some(shared) = self.shared
            && shared.has_blob(name)
        {
            return shared.get_blob(name);
        }
        warn!(workspace = %self.id, blob = name, "Blob not in the workspace.");
        None
    }

    /// Whether `name` resolves locally or through the parent chain.
    pub fn has_blob(&self, name: &str) -> bool {
        self.blob_map.contains_key(name) || self.shared.is_some_and(|s| s.has_blob(name))
    }

    pub fn has_local_blob(&self, name: &str) -> bool {
        self.blob_map.contains_key(name)
    }

    /// Rename a local blob, keeping its position in the local listing.
    pub fn rename_blob(&mut self, old_name: &str, new_name: &str) -> Result<&Blob, WorkspaceError> {
        if !self.blob_map.contains_key(old_name) {
            return Err(WorkspaceError::BlobNotFound(old_name.to_string()));
        }
        if old_name != new_name {
            if self.blob_map.contains_key(new_name) {
                return Err(WorkspaceError::BlobExists(new_name.to_string()));
            }
            if let Some((index, _, blob)) = self.blob_map.shift_remove_full(old_name) {
                self.blob_map.shift_insert(index, new_name.to_string(), blob);
            }
            debug!(from = old_name, to = new_name, "Renamed blob");
        }
        self.blob_map
            .get(new_name)
            .ok_or_else(|| WorkspaceError::BlobNotFound(new_name.to_string()))
    }

    /// Names of blobs owned by this workspace, in creation order.
    pub fn local_blobs(&self) -> Vec<String> {
        self.blob_map.keys().cloned().collect()
    }

    /// Local names followed by everything visible through the parent.
    ///
    /// A name shadowed locally appears twice.
    pub fn blobs(&self) -> Vec<String> {
        let mut names = self.local_blobs();
        if let Some(shared) = self.shared {
            names.extend(shared.blobs());
        }
        names
    }
}
