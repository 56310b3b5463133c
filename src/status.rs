//! Parser for `git status -z` porcelain output.
//!
//! Each entry is two state characters (index, tree), a space, and a path,
//! NUL-terminated. A rename or copy operation emits the source path as an
//! extra NUL-terminated token right after the entry. This module is the only
//! place the two-character state alphabet is interpreted; everything else
//! goes through the predicates on [`StatusEntry`].

use crate::{Result, VaultError};
use std::fmt;

const RENAME_OPS: [char; 2] = ['R', 'C'];

/// One working-tree change relative to the index/commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// State of the path in the index.
    pub index: char,
    /// State of the path in the working tree.
    pub tree: char,
    /// The affected path. For renames and copies this is the destination.
    pub path: String,
    /// Source path of a rename or copy.
    pub rename_from: Option<String>,
}

impl StatusEntry {
    /// Neither the index nor the working tree holds a change.
    pub fn is_clean(&self) -> bool {
        self.index == ' ' && self.tree == ' '
    }

    /// The working tree holds no change (the index still may).
    pub fn is_tree_clean(&self) -> bool {
        self.tree == ' '
    }

    /// The path was deleted from the working tree but the deletion is not
    /// staged yet.
    pub fn is_deletion(&self) -> bool {
        self.index == ' ' && self.tree == 'D'
    }

    fn is_rename(&self) -> bool {
        RENAME_OPS.contains(&self.index) || RENAME_OPS.contains(&self.tree)
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rename_from {
            Some(from) => write!(f, "{}{} {} -> {}", self.index, self.tree, from, self.path),
            None => write!(f, "{}{} {}", self.index, self.tree, self.path),
        }
    }
}

/// Render a status list for error payloads and logs.
pub fn dump(entries: &[StatusEntry]) -> String {
    entries
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse NUL-split status tokens into ordered entries.
///
/// Blank tokens (artifacts of splitting on the trailing NUL) are skipped.
/// Fails with [`VaultError::MalformedStatus`] when a token is shorter than
/// four bytes without the separating space at position 2, and with
/// [`VaultError::MissingRenameSource`] when a rename/copy entry is the last
/// token in the stream.
pub fn parse<'a, I>(tokens: I) -> Result<Vec<StatusEntry>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stream = tokens.into_iter().filter(|t| !t.is_empty());
    let mut entries = Vec::new();

    while let Some(token) = stream.next() {
        let bytes = token.as_bytes();
        if bytes.len() < 4 && bytes.get(2) != Some(&b' ') {
            return Err(VaultError::MalformedStatus {
                token: token.to_string(),
            });
        }

        let mut entry = StatusEntry {
            index: bytes[0] as char,
            tree: bytes[1] as char,
            path: token.get(3..).unwrap_or("").to_string(),
            rename_from: None,
        };

        if entry.is_rename() {
            // The token just read names the destination; the source follows
            // as its own token.
            let from = stream.next().ok_or_else(|| VaultError::MissingRenameSource {
                token: token.to_string(),
            })?;
            entry.rename_from = Some(from.to_string());
        }

        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_raw(raw: &str) -> Result<Vec<StatusEntry>> {
        parse(raw.split('\0'))
    }

    #[test]
    fn test_parses_simple_entries_in_order() -> Result<()> {
        let entries = parse_raw("A  added\0 M modified\0?? stray\0")?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].index, 'A');
        assert_eq!(entries[0].tree, ' ');
        assert_eq!(entries[0].path, "added");
        assert_eq!(entries[1].index, ' ');
        assert_eq!(entries[1].tree, 'M');
        assert_eq!(entries[2].path, "stray");
        Ok(())
    }

    #[test]
    fn test_rename_consumes_following_token_as_source() -> Result<()> {
        let entries = parse_raw("R  A\0a\0M  b\0")?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 'R');
        assert_eq!(entries[0].path, "A");
        assert_eq!(entries[0].rename_from.as_deref(), Some("a"));
        assert_eq!(entries[1].index, 'M');
        assert_eq!(entries[1].path, "b");
        assert_eq!(entries[1].rename_from, None);
        Ok(())
    }

    #[test]
    fn test_copy_in_tree_position_also_takes_a_source() -> Result<()> {
        let entries = parse_raw(" C dst\0src\0")?;
        assert_eq!(entries[0].rename_from.as_deref(), Some("src"));
        Ok(())
    }

    #[test]
    fn test_rename_without_source_fails() {
        let result = parse_raw("R  A\0");
        assert!(matches!(
            result,
            Err(VaultError::MissingRenameSource { .. })
        ));
    }

    #[test]
    fn test_short_token_without_separator_fails() {
        let result = parse_raw("AB\0");
        assert!(matches!(result, Err(VaultError::MalformedStatus { .. })));
    }

    #[test]
    fn test_blank_tokens_are_skipped() -> Result<()> {
        let entries = parse_raw("\0\0M  x\0\0")?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "x");
        Ok(())
    }

    #[test]
    fn test_clean_predicates() {
        let staged = StatusEntry {
            index: 'M',
            tree: ' ',
            path: "f".into(),
            rename_from: None,
        };
        assert!(!staged.is_clean());
        assert!(staged.is_tree_clean());

        let deleted = StatusEntry {
            index: ' ',
            tree: 'D',
            path: "f".into(),
            rename_from: None,
        };
        assert!(deleted.is_deletion());
        assert!(!deleted.is_tree_clean());
    }

    #[test]
    fn test_display_includes_rename_source() {
        let entry = StatusEntry {
            index: 'R',
            tree: ' ',
            path: "new".into(),
            rename_from: Some("old".into()),
        };
        assert_eq!(entry.to_string(), "R  old -> new");
    }
}
