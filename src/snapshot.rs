//! Snapshot tags, the `latest` pointer, and annotation notes.
//!
//! Snapshot tags are distinguished from ordinary repository tags (`anchor`,
//! `latest`) by a reserved prefix character, which `list` strips again.

use crate::git::Git;
use crate::Result;

/// Reserved prefix marking a tag as a snapshot.
pub const SNAPSHOT_PREFIX: char = '>';

/// A named point in the backup history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub tag: String,
    pub note: Option<String>,
}

pub struct SnapshotManager<'a> {
    git: &'a Git,
}

impl<'a> SnapshotManager<'a> {
    pub fn new(git: &'a Git) -> Self {
        Self { git }
    }

    fn tag_ref(name: &str) -> String {
        format!("{}{}", SNAPSHOT_PREFIX, name)
    }

    /// Tag the current commit as snapshot `name`.
    pub fn create(&self, name: &str) -> Result<()> {
        self.git.tag_create(&Self::tag_ref(name))
    }

    /// Move the `latest` pointer to the current commit.
    pub fn retag_latest(&self) -> Result<()> {
        self.git.tag_delete("latest")?;
        self.git.tag_create("latest")
    }

    /// Attach a free-text note to snapshot `name`.
    pub fn annotate(&self, name: &str, message: &str) -> Result<()> {
        self.git.notes_add(&Self::tag_ref(name), message)
    }

    /// Check out snapshot `name`.
    pub fn activate(&self, name: &str) -> Result<()> {
        self.git.checkout(&Self::tag_ref(name))
    }

    /// All snapshots in tag order, each paired with its note if one exists.
    pub fn list(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for tag in self.git.tag_list()? {
            if let Some(name) = tag.strip_prefix(SNAPSHOT_PREFIX) {
                let note = self.git.notes_show(&tag)?;
                snapshots.push(Snapshot {
                    tag: name.to_string(),
                    note,
                });
            }
        }
        Ok(snapshots)
    }
}
