use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Load-progress callback, invoked with 0..=100. Only called when the
/// transfer size is known up front.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u8);

/// Source of raw model bytes. The HTTP implementation is the production
/// path; tests substitute in-memory fetchers.
pub trait Fetcher {
    fn fetch(&self, url: &str, progress: ProgressFn) -> Result<Vec<u8>, FetchError>;
}

/// Fetches model files over HTTP with a hard timeout, reporting progress
/// from `Content-Length` when the asset host provides it. Fetched bytes are
/// mirrored into an on-disk cache keyed by the SHA-256 of the URL so a
/// previously viewed model survives restarts and offline sessions.
pub struct HttpFetcher {
    agent: ureq::Agent,
    cache_dir: Option<PathBuf>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, cache_dir: Option<PathBuf>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, cache_dir }
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let digest = Sha256::digest(url.as_bytes());
        Some(dir.join(format!("{digest:x}.mesh")))
    }

    fn read_cache(&self, path: &Path) -> Option<Vec<u8>> {
        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("Byte cache read failed for {}: {err}", path.display());
                None
            }
        }
    }

    fn write_cache(&self, path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                log::warn!("Byte cache dir create failed: {err}");
                return;
            }
        }
        if let Err(err) = std::fs::write(path, bytes) {
            log::warn!("Byte cache write failed for {}: {err}", path.display());
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, progress: ProgressFn) -> Result<Vec<u8>, FetchError> {
        if let Some(path) = self.cache_path(url) {
            if let Some(bytes) = self.read_cache(&path) {
                log::debug!("Byte cache hit for {url} ({} bytes)", bytes.len());
                progress(100);
                return Ok(bytes);
            }
        }

        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let total: Option<u64> = response
            .header("Content-Length")
            .and_then(|value| value.parse().ok())
            .filter(|value| *value > 0);

        let mut reader = response.into_reader();
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 16 * 1024];
        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..read]);
            if let Some(total) = total {
                let percent = (bytes.len() as u64 * 100 / total).min(100) as u8;
                progress(percent);
            }
        }

        if let Some(path) = self.cache_path(url) {
            self.write_cache(&path, &bytes);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_path_is_stable_per_url() {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(1),
            Some(PathBuf::from("/tmp/vitrina-bytes")),
        );
        let a = fetcher.cache_path("https://cdn.example/door.obj").unwrap();
        let b = fetcher.cache_path("https://cdn.example/door.obj").unwrap();
        let c = fetcher.cache_path("https://cdn.example/window.obj").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.extension().is_some_and(|ext| ext == "mesh"));
    }

    #[test]
    fn cache_path_disabled_without_cache_dir() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1), None);
        assert!(fetcher.cache_path("https://cdn.example/door.obj").is_none());
    }

    #[test]
    fn cached_bytes_short_circuit_the_network() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("vitrina_fetch_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let fetcher = HttpFetcher::new(Duration::from_secs(1), Some(dir.clone()));
        let url = "https://cdn.example/prefilled.obj";
        let path = fetcher.cache_path(url).unwrap();
        std::fs::write(&path, b"v 0 0 0").unwrap();

        let mut last_progress = 0u8;
        let bytes = fetcher
            .fetch(url, &mut |percent| last_progress = percent)
            .unwrap();
        assert_eq!(bytes, b"v 0 0 0");
        assert_eq!(last_progress, 100);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
