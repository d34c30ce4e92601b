//! Candidate endpoint names for an indexed family of local endpoints.
//!
//! Hosts that expose a numbered set of endpoints (`{prefix}0`, `{prefix}1`, ...)
//! place them in different spots depending on the platform and on how the host
//! was packaged. [`EndpointLocator`] lists every place worth trying, in order.

use std::{env, path::PathBuf};

use crate::config::DEFAULT_ENDPOINT_PREFIX;

const DEFAULT_VARIATIONS: u32 = 10;

/// Sandboxed installs put their runtime files one level down
const DEFAULT_SANDBOX_DIRS: &[&str] = &["app/com.discordapp.Discord", "snap.discord"];

const TEMP_DIR_VARS: &[&str] = &["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];
const FALLBACK_TEMP_DIR: &str = "/tmp";

/// Full Windows named pipe path for a bare pipe name
pub fn windows_pipe_path(name: &str) -> String {
    format!(r"\\.\pipe\{name}")
}

/// Directories searched for Unix sockets, most specific first, without duplicates
pub fn temp_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let found = TEMP_DIR_VARS
        .iter()
        .filter_map(|var| env::var_os(var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .chain(std::iter::once(PathBuf::from(FALLBACK_TEMP_DIR)));

    for dir in found {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Enumerates endpoint names to try when connecting to an indexed endpoint family
#[derive(Debug, Clone)]
pub struct EndpointLocator {
    prefix:       String,
    start:        u32,
    variations:   u32,
    sandbox_dirs: Vec<String>,
}

impl Default for EndpointLocator {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_PREFIX)
    }
}

impl EndpointLocator {
    /// Creates a locator for `{prefix}{index}` endpoints starting at index 0
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix:       prefix.into(),
            start:        0,
            variations:   DEFAULT_VARIATIONS,
            sandbox_dirs: DEFAULT_SANDBOX_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the first index to try
    pub fn with_start(mut self, start: u32) -> Self {
        self.start = start;
        self
    }

    /// Set how many consecutive indices to try
    pub fn with_variations(mut self, variations: u32) -> Self {
        self.variations = variations;
        self
    }

    /// Replace the sandbox sub-directories searched under each temp directory
    pub fn with_sandbox_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sandbox_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Bare endpoint names, one per index
    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..self.start.saturating_add(self.variations))
            .map(move |index| format!("{}{}", self.prefix, index))
    }

    /// Every candidate for the current platform, in connection order
    pub fn candidates(&self) -> Vec<String> {
        #[cfg(windows)]
        {
            self.names().map(|name| windows_pipe_path(&name)).collect()
        }

        #[cfg(not(windows))]
        {
            self.candidates_in(&temp_directories())
        }
    }

    /// Unix socket candidates under the given directories.
    ///
    /// For every index, each directory yields the bare path first and then one
    /// path per sandbox sub-directory.
    pub fn candidates_in(&self, dirs: &[PathBuf]) -> Vec<String> {
        let mut out = Vec::new();
        for name in self.names() {
            for dir in dirs {
                out.push(dir.join(&name).to_string_lossy().into_owned());
                for sandbox in &self.sandbox_dirs {
                    out.push(dir.join(sandbox).join(&name).to_string_lossy().into_owned());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_follow_index_range() {
        let locator = EndpointLocator::new("svc-").with_start(3).with_variations(2);
        let names: Vec<String> = locator.names().collect();
        assert_eq!(names, vec!["svc-3", "svc-4"]);
    }

    #[test]
    fn test_default_locator_has_ten_names() {
        let locator = EndpointLocator::default();
        let names: Vec<String> = locator.names().collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "discord-ipc-0");
        assert_eq!(names[9], "discord-ipc-9");
    }

    #[test]
    fn test_unix_candidate_order() {
        let locator = EndpointLocator::new("ipc-")
            .with_variations(2)
            .with_sandbox_dirs(["snap.host"]);
        let dirs = vec![PathBuf::from("/run/user/1000"), PathBuf::from("/tmp")];

        let candidates = locator.candidates_in(&dirs);
        assert_eq!(
            candidates,
            vec![
                "/run/user/1000/ipc-0",
                "/run/user/1000/snap.host/ipc-0",
                "/tmp/ipc-0",
                "/tmp/snap.host/ipc-0",
                "/run/user/1000/ipc-1",
                "/run/user/1000/snap.host/ipc-1",
                "/tmp/ipc-1",
                "/tmp/snap.host/ipc-1",
            ]
        );
    }

    #[test]
    fn test_zero_variations_yield_nothing() {
        let locator = EndpointLocator::new("ipc-").with_variations(0);
        assert!(locator.candidates_in(&[PathBuf::from("/tmp")]).is_empty());
    }

    #[test]
    fn test_windows_pipe_path() {
        assert_eq!(windows_pipe_path("discord-ipc-0"), r"\\.\pipe\discord-ipc-0");
    }

    #[test]
    fn test_temp_directories_end_with_fallback() {
        let dirs = temp_directories();
        assert!(dirs.contains(&PathBuf::from(FALLBACK_TEMP_DIR)));

        let unique: std::collections::HashSet<_> = dirs.iter().collect();
        assert_eq!(unique.len(), dirs.len());
    }
}
