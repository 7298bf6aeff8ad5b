use std::path::PathBuf;

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};

use super::{AnnouncedSet, AnnouncedStore, LoadStatus, LoadedSet};
use crate::error::PersistError;

/// Announced set kept as a pretty-printed JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn io_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Accepts both string and numeric identifiers; other entries are skipped.
fn parse_ids(content: &str) -> Result<AnnouncedSet, serde_json::Error> {
    let raw: Vec<serde_json::Value> = serde_json::from_str(content)?;
    Ok(raw
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl AnnouncedStore for JsonFileStore {
    async fn load(&self) -> LoadedSet {
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(target: "store", path = %self.path.display(), "no announced set yet");
                return LoadedSet {
                    set: AnnouncedSet::new(),
                    status: LoadStatus::Missing,
                };
            }
            Err(e) => {
                tracing::warn!(target: "store", path = %self.path.display(), error = %e, "announced set unreadable; starting empty");
                return LoadedSet {
                    set: AnnouncedSet::new(),
                    status: LoadStatus::Corrupt,
                };
            }
        };

        match parse_ids(&content) {
            Ok(set) => LoadedSet {
                set,
                status: LoadStatus::Loaded,
            },
            Err(e) => {
                tracing::warn!(target: "store", path = %self.path.display(), error = %e, "announced set corrupt; starting empty");
                LoadedSet {
                    set: AnnouncedSet::new(),
                    status: LoadStatus::Corrupt,
                }
            }
        }
    }

    async fn save(&self, set: &AnnouncedSet) -> Result<(), PersistError> {
        let mut json = serde_json::to_vec_pretty(set)?;
        json.push(b'\n');

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|e| self.io_err(e))?;
        }

        let tmp = self.tmp_path();
        let mut f = fs::File::create(&tmp).await.map_err(|e| self.io_err(e))?;
        f.write_all(&json).await.map_err(|e| self.io_err(e))?;
        f.sync_all().await.map_err(|e| self.io_err(e))?;
        drop(f);
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;

        tracing::debug!(target: "store", path = %self.path.display(), count = set.len(), "announced set saved");
        Ok(())
    }
}
