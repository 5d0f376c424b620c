//! Ban and operator lists.
//!
//! Both are plain name sets. `NameList` keeps the set in memory and, when
//! given a path, mirrors it to a one-name-per-line text file that is rewritten
//! on every change.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub trait BanList: Send + Sync {
    fn is_banned(&self, name: &str) -> bool;
    /// Returns `false` if the name was already banned.
    fn ban(&self, name: &str) -> bool;
    /// Returns `false` if the name was not banned.
    fn unban(&self, name: &str) -> bool;
}

pub trait OpList: Send + Sync {
    fn is_operator(&self, name: &str) -> bool;
    fn grant(&self, name: &str) -> bool;
    fn revoke(&self, name: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct NameList {
    names: RwLock<BTreeSet<String>>,
    path: Option<PathBuf>,
}

impl NameList {
    /// An in-memory list that is never written anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` if it exists; an absent file is an empty list. Blank lines
    /// are skipped and surrounding whitespace trimmed.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let names = match fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e),
        };
        tracing::debug!("loaded {} names from {}", names.len(), path.display());
        Ok(Self {
            names: RwLock::new(names),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.read().expect("name list poisoned").contains(name)
    }

    pub fn insert(&self, name: &str) -> bool {
        let mut names = self.names.write().expect("name list poisoned");
        let added = names.insert(name.to_owned());
        if added {
            self.persist(&names);
        }
        added
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut names = self.names.write().expect("name list poisoned");
        let removed = names.remove(name);
        if removed {
            self.persist(&names);
        }
        removed
    }

    pub fn names(&self) -> Vec<String> {
        self.names
            .read()
            .expect("name list poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Persistence failures are logged, not returned: the in-memory list stays
    /// authoritative for the running server.
    fn persist(&self, names: &BTreeSet<String>) {
        let Some(path) = &self.path else {
            return;
        };
        let mut text = String::new();
        for name in names {
            text.push_str(name);
            text.push('\n');
        }
        if let Err(e) = fs::write(path, text) {
            tracing::error!("Failed to write {}: {}", path.display(), e);
        }
    }
}

impl BanList for NameList {
    fn is_banned(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn ban(&self, name: &str) -> bool {
        self.insert(name)
    }

    fn unban(&self, name: &str) -> bool {
        self.remove(name)
    }
}

impl OpList for NameList {
    fn is_operator(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn grant(&self, name: &str) -> bool {
        self.insert(name)
    }

    fn revoke(&self, name: &str) -> bool {
        self.remove(name)
    }
}
