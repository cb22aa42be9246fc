//! A remote source backed by a JSON snapshot file.

use std::path::{Path, PathBuf};
use wardsync_protocol::{
    MemoryRemote, ObservationPage, RemoteChart, RemoteConcept, RemoteError, RemoteForm,
    RemoteLocation, RemoteOrder, RemotePatient, RemoteResult, RemoteSnapshot, RemoteSource,
    RemoteUser,
};

/// Serves a [`RemoteSnapshot`] file, re-reading it before every call so
/// edits show up in the next sync.
pub struct FileRemote {
    path: PathBuf,
    inner: MemoryRemote,
}

impl FileRemote {
    /// Opens the snapshot at `path`.
    pub fn open(path: &Path) -> RemoteResult<Self> {
        let remote = Self {
            path: path.to_owned(),
            inner: MemoryRemote::new(RemoteSnapshot::default()),
        };
        remote.refresh()?;
        Ok(remote)
    }

    fn refresh(&self) -> RemoteResult<()> {
        let json = std::fs::read_to_string(&self.path)
            .map_err(|e| RemoteError::Unreachable(format!("{}: {e}", self.path.display())))?;
        let snapshot: RemoteSnapshot = serde_json::from_str(&json)?;
        self.inner.update(|s| *s = snapshot);
        Ok(())
    }
}

impl RemoteSource for FileRemote {
    fn list_users(&self) -> RemoteResult<Vec<RemoteUser>> {
        self.refresh()?;
        self.inner.list_users()
    }

    fn list_locations(&self) -> RemoteResult<Vec<RemoteLocation>> {
        self.refresh()?;
        self.inner.list_locations()
    }

    fn list_concepts(&self) -> RemoteResult<Vec<RemoteConcept>> {
        self.refresh()?;
        self.inner.list_concepts()
    }

    fn list_charts(&self) -> RemoteResult<Vec<RemoteChart>> {
        self.refresh()?;
        self.inner.list_charts()
    }

    fn list_patients(&self) -> RemoteResult<Vec<RemotePatient>> {
        self.refresh()?;
        self.inner.list_patients()
    }

    fn list_observations(&self, since: Option<&str>) -> RemoteResult<ObservationPage> {
        self.refresh()?;
        self.inner.list_observations(since)
    }

    fn list_orders(&self) -> RemoteResult<Vec<RemoteOrder>> {
        self.refresh()?;
        self.inner.list_orders()
    }

    fn list_forms(&self) -> RemoteResult<Vec<RemoteForm>> {
        self.refresh()?;
        self.inner.list_forms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rereads_file_on_each_call() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, r#"{"users": [{"uuid": "u1", "full_name": "Ana"}]}"#).unwrap();

        let remote = FileRemote::open(&path).unwrap();
        assert_eq!(remote.list_users().unwrap().len(), 1);

        std::fs::write(&path, r#"{"users": []}"#).unwrap();
        assert!(remote.list_users().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_unreachable() {
        let dir = TempDir::new().unwrap();
        let err = FileRemote::open(&dir.path().join("absent.json")).err().unwrap();
        assert!(matches!(err, RemoteError::Unreachable(_)));
    }

    #[test]
    fn bad_json_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remote.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileRemote::open(&path).err().unwrap();
        assert!(matches!(err, RemoteError::Malformed(_)));
    }
}
