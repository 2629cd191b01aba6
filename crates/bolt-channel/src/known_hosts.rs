use crate::error::ChannelError;
use std::collections::HashMap;
use std::fs;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

/// One record per `host:port`, as `host:port SHA512-hex-fingerprint\n`
/// (spec.md §6). Loaded once at connect time; new entries are appended
/// to disk as they're learned under on-first-use trust.
pub struct KnownHosts {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl KnownHosts {
    /// Default location: a hidden subdirectory of the user's home
    /// directory, matching the shape spec.md §6 describes.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bolt-driver")
            .join("known_hosts")
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ChannelError> {
        let path = path.into();
        let mut entries = HashMap::new();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some((id, fingerprint)) = line.split_once(' ') {
                        entries.insert(id.to_owned(), fingerprint.to_owned());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ChannelError::KnownHosts(e.to_string())),
        }
        Ok(KnownHosts {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn host_id(host: &str, port: u16) -> String {
        format!("{host}:{port}")
    }

    pub fn fingerprint_for(&self, host: &str, port: u16) -> Option<String> {
        self.entries
            .lock()
            .expect("known-hosts lock poisoned")
            .get(&Self::host_id(host, port))
            .cloned()
    }

    /// Record a newly-trusted fingerprint, appending a line to the
    /// backing file. Serialized per-host: two concurrent first-use
    /// connections to the same host never interleave partial writes.
    pub fn record(&self, host: &str, port: u16, fingerprint: &str) -> Result<(), ChannelError> {
        let id = Self::host_id(host, port);
        let mut entries = self.entries.lock().expect("known-hosts lock poisoned");
        if entries.contains_key(&id) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ChannelError::KnownHosts(e.to_string()))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ChannelError::KnownHosts(e.to_string()))?;
        writeln!(file, "{id} {fingerprint}").map_err(|e| ChannelError::KnownHosts(e.to_string()))?;
        entries.insert(id, fingerprint.to_owned());
        Ok(())
    }
}

pub(crate) fn sha512_hex(der: &[u8]) -> String {
    use sha2::{Digest, Sha512};
    let digest = Sha512::digest(der);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_reloads_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");

        let hosts = KnownHosts::load(&path).unwrap();
        assert!(hosts.fingerprint_for("db.example.com", 7687).is_none());
        hosts.record("db.example.com", 7687, "abc123").unwrap();
        assert_eq!(
            hosts.fingerprint_for("db.example.com", 7687).as_deref(),
            Some("abc123")
        );

        let reloaded = KnownHosts::load(&path).unwrap();
        assert_eq!(
            reloaded.fingerprint_for("db.example.com", 7687).as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = KnownHosts::load(dir.path().join("does-not-exist")).unwrap();
        assert!(hosts.fingerprint_for("anything", 1).is_none());
    }

    #[test]
    fn recording_an_existing_host_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        let hosts = KnownHosts::load(&path).unwrap();
        hosts.record("h", 1, "first").unwrap();
        hosts.record("h", 1, "second").unwrap();
        assert_eq!(hosts.fingerprint_for("h", 1).as_deref(), Some("first"));
    }
}
