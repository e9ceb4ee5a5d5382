//! Friendly-host allow-list.
//!
//! The file holds one hostname suffix per line. Blank lines and lines
//! starting with `#` are ignored. A suffix matches the host itself and any
//! subdomain of it, so `example.org` matches `example.org` and
//! `www.example.org` but not `badexample.org`.

use std::fs;
use std::path::Path;

/// Hosts that bypass stripping and resizing.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    suffixes: Vec<String>,
}

impl AllowList {
    /// Build from an iterator of suffixes, normalizing case and dots.
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .filter_map(|s| {
                let s = s.as_ref().trim();
                if s.is_empty() || s.starts_with('#') {
                    return None;
                }
                Some(s.trim_matches('.').to_ascii_lowercase())
            })
            .filter(|s| !s.is_empty())
            .collect();
        Self { suffixes }
    }

    /// Parse allow-list file content.
    pub fn parse(content: &str) -> Self {
        Self::new(content.lines())
    }

    /// Load the allow-list file.
    ///
    /// A missing or unreadable file is not fatal: it is logged and the
    /// proxy runs with no friendly hosts.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => {
                let list = Self::parse(&content);
                tracing::info!(path = %path.display(), hosts = list.len(), "Allow-list loaded");
                list
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read allow-list, continuing with no friendly hosts"
                );
                Self::default()
            }
        }
    }

    /// Returns true if `host` is on the list.
    pub fn is_friendly(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.suffixes.iter().any(|suffix| {
            host == *suffix
                || host
                    .strip_suffix(suffix.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.suffixes.len()
    }
}
