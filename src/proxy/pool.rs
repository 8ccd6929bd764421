//! Cyclic pool of outbound proxies.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use super::{ProxyEndpoint, ProxyError};

/// Ordered, never-empty set of proxies handed out round-robin.
#[derive(Debug)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    /// Build a pool from already parsed endpoints.
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Result<Self, ProxyError> {
        if endpoints.is_empty() {
            return Err(ProxyError::EmptyPool);
        }
        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Parse proxy URIs, skipping blank lines, `#` comments and malformed entries.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ProxyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut endpoints = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match ProxyEndpoint::parse(line) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => warn!("Skipping proxy entry: {}", e),
            }
        }
        Self::new(endpoints)
    }

    /// Load a proxy list file, one URI per line.
    pub fn from_file(path: &Path) -> Result<Self, ProxyError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProxyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pool = Self::from_lines(content.lines())?;
        debug!("Loaded {} proxies from {}", pool.len(), path.display());
        Ok(pool)
    }

    /// Shuffle the endpoint order and rewind the cursor.
    pub fn shuffled(mut self) -> Self {
        self.endpoints.shuffle(&mut rand::rng());
        self.cursor = AtomicUsize::new(0);
        self
    }

    /// Current endpoint; advances the cursor, wrapping after the last one.
    pub fn next(&self) -> &ProxyEndpoint {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[ProxyEndpoint] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROXIES: [&str; 3] = [
        "http://a:b@10.0.0.1:8000",
        "http://c:d@10.0.0.2:8000",
        "socks5://10.0.0.3:1080",
    ];

    #[test]
    fn test_next_cycles_and_wraps() {
        let pool = ProxyPool::from_lines(PROXIES).unwrap();

        let seen: Vec<String> = (0..PROXIES.len() + 1).map(|_| pool.next().to_string()).collect();

        assert_eq!(seen[0], PROXIES[0]);
        assert_eq!(seen[1], PROXIES[1]);
        assert_eq!(seen[2], PROXIES[2]);
        assert_eq!(seen[3], PROXIES[0]); // Wraps around
    }

    #[test]
    fn test_single_endpoint_repeats() {
        let pool = ProxyPool::from_lines(["http://10.0.0.9:3128"]).unwrap();
        for _ in 0..3 {
            assert_eq!(pool.next().address(), "10.0.0.9:3128");
        }
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        assert!(matches!(
            ProxyPool::from_lines(Vec::<String>::new()),
            Err(ProxyError::EmptyPool)
        ));
        assert!(matches!(
            ProxyPool::from_lines(["garbage", "# comment", ""]),
            Err(ProxyError::EmptyPool)
        ));
    }

    #[test]
    fn test_from_file_skips_comments_and_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# proxies").unwrap();
        writeln!(file, "{}", PROXIES[0]).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "broken-entry").unwrap();
        writeln!(file, "{}", PROXIES[1]).unwrap();

        let pool = ProxyPool::from_file(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_shuffle_keeps_all_endpoints() {
        let pool = ProxyPool::from_lines(PROXIES).unwrap().shuffled();
        let mut seen: Vec<String> = pool.endpoints().iter().map(|e| e.to_string()).collect();
        seen.sort();
        let mut expected: Vec<String> = PROXIES.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }
}
