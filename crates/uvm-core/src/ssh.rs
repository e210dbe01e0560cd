//! Local SSH public key discovery.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// A public key offered for selection in the SSH phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyOption {
    /// File name or `github:<user>` for imported keys
    pub source: String,
    /// The full `type base64 [comment]` line
    pub key: String,
}

impl SshKeyOption {
    /// Short label: key type plus comment (or source when there is none).
    pub fn label(&self) -> String {
        let mut parts = self.key.split_whitespace();
        let kind = parts.next().unwrap_or("key");
        let _body = parts.next();
        let comment = parts.collect::<Vec<_>>().join(" ");
        if comment.is_empty() {
            format!("{} ({})", kind, self.source)
        } else {
            format!("{} {} ({})", kind, comment, self.source)
        }
    }
}

/// Rough check that a line looks like an OpenSSH public key.
pub fn looks_like_public_key(line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(kind), Some(body)) => {
            (kind.starts_with("ssh-") || kind.starts_with("ecdsa-") || kind.starts_with("sk-"))
                && body.len() > 16
        }
        _ => false,
    }
}

/// Read every `*.pub` file in `dir`. A missing directory yields no keys.
pub fn discover_public_keys(dir: &Path) -> Result<Vec<SshKeyOption>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read SSH directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("pub"))
        .collect::<Vec<_>>();
    entries.sort();

    let mut keys = Vec::new();
    for path in entries {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("key.pub")
            .to_string();
        for line in content.lines().map(str::trim) {
            if looks_like_public_key(line) {
                keys.push(SshKeyOption {
                    source: source.clone(),
                    key: line.to_string(),
                });
            }
        }
    }
    Ok(keys)
}

/// Key type plus base64 body; the comment doesn't identify a key.
pub fn key_identity(line: &str) -> String {
    line.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

pub fn same_key(a: &str, b: &str) -> bool {
    key_identity(a) == key_identity(b)
}

/// Keep the first occurrence of each key, preserving order. Lines that
/// differ only in their comment count as the same key.
pub fn dedup_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        let key = key.trim().to_string();
        if !key.is_empty() && !out.iter().any(|k| same_key(k, &key)) {
            out.push(key);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKEYKEYKEY me@laptop";

    #[test]
    fn discovers_pub_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("id_ed25519.pub"), format!("{}\n", KEY)).unwrap();
        fs::write(dir.path().join("id_ed25519"), "PRIVATE").unwrap();
        fs::write(dir.path().join("notes.pub"), "not a key").unwrap();

        let keys = discover_public_keys(dir.path()).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].source, "id_ed25519.pub");
        assert_eq!(keys[0].key, KEY);
        assert_eq!(keys[0].label(), "ssh-ed25519 me@laptop (id_ed25519.pub)");
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        assert!(discover_public_keys(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn dedup_preserves_first_occurrence() {
        let keys = dedup_keys(vec![
            "b".to_string(),
            "a".to_string(),
            " b ".to_string(),
            String::new(),
        ]);
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn dedup_ignores_comments() {
        let github_copy = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKEYKEYKEY";
        let other = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOTHER me@laptop";
        let keys = dedup_keys(vec![
            KEY.to_string(),
            github_copy.to_string(),
            format!("{}  work", github_copy),
            other.to_string(),
        ]);
        assert_eq!(keys, vec![KEY, other]);
        assert!(same_key(KEY, github_copy));
        assert!(!same_key(KEY, other));
    }
}
