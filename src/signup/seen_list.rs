use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key the seen list is stored under.
pub const STORAGE_KEY: &str = "entru_emails";
/// Only the most recent submissions are remembered.
pub const SEEN_LIST_CAPACITY: usize = 200;

#[derive(thiserror::Error, Debug)]
pub enum SeenStoreError {
    #[error("Failed to write the seen list.")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize the seen list.")]
    Serialize(#[from] serde_json::Error),
}

/// Emails this client already submitted, oldest first.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SeenList(VecDeque<String>);

impl SeenList {
    pub fn contains(&self, email: &str) -> bool {
        self.0.iter().any(|seen| seen == email)
    }

    /// Appends `email`, dropping the oldest entries beyond the capacity.
    pub fn push(&mut self, email: String) {
        self.0.push_back(email);

        while self.0.len() > SEEN_LIST_CAPACITY {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for SeenList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut seen = SeenList::default();

        for email in iter {
            seen.push(email);
        }

        seen
    }
}

/// Where a client keeps its seen list between submissions.
pub trait SeenStore {
    /// Missing or unreadable data loads as an empty list.
    fn load(&self) -> SeenList;

    fn save(&mut self, seen: &SeenList) -> Result<(), SeenStoreError>;
}

/// Seen list kept as a JSON array in `<dir>/entru_emails.json`.
pub struct FileSeenStore {
    path: PathBuf,
}

impl FileSeenStore {
    pub fn new(dir: impl AsRef<Path>) -> FileSeenStore {
        FileSeenStore {
            path: dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeenStore for FileSeenStore {
    fn load(&self) -> SeenList {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return SeenList::default(),
            Err(err) => {
                tracing::warn!("Ignoring unreadable seen list at {:?}: {}", self.path, err);
                return SeenList::default();
            }
        };

        serde_json::from_slice(&contents).unwrap_or_else(|err| {
            tracing::warn!("Ignoring unreadable seen list at {:?}: {}", self.path, err);
            SeenList::default()
        })
    }

    fn save(&mut self, seen: &SeenList) -> Result<(), SeenStoreError> {
        let contents = serde_json::to_vec(seen)?;
        std::fs::write(&self.path, contents)?;

        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySeenStore {
    seen: SeenList,
}

impl MemorySeenStore {
    pub fn new(seen: SeenList) -> MemorySeenStore {
        MemorySeenStore { seen }
    }

    pub fn seen(&self) -> &SeenList {
        &self.seen
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> SeenList {
        self.seen.clone()
    }

    fn save(&mut self, seen: &SeenList) -> Result<(), SeenStoreError> {
        self.seen = seen.clone();

        Ok(())
    }
}
