//! Liveness checks for the process that owns a tracker file.

use std::process::Command;

use tracing::debug;

/// Answers whether a pid belongs to a live batch process.
pub trait ProcessTable: Send + Sync {
    fn is_running(&self, pid: u32) -> bool;
}

/// Process table read through `ps`, matching the command line against a signature.
#[derive(Debug, Clone)]
pub struct PsProcessTable {
    signature: String,
}

impl PsProcessTable {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    fn list(&self) -> Option<String> {
        let output = Command::new("ps").args(["-eo", "pid=,args="]).output();
        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!("ps exited with {}", output.status);
                None
            }
            Err(e) => {
                debug!("Failed to run ps: {}", e);
                None
            }
        }
    }
}

impl ProcessTable for PsProcessTable {
    fn is_running(&self, pid: u32) -> bool {
        let Some(listing) = self.list() else {
            return false;
        };
        listing_contains(&listing, pid, &self.signature)
    }
}

/// Whether a `pid args` listing has `pid` running a command containing `signature`.
fn listing_contains(listing: &str, pid: u32, signature: &str) -> bool {
    listing.lines().any(|line| {
        let line = line.trim_start();
        let (pid_field, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        pid_field.parse::<u32>() == Ok(pid) && args.contains(signature)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "    1 /sbin/init\n  812 /usr/local/bin/fssp run requests.json\n 9000 vim fssp.toml\n";

    #[test]
    fn test_listing_matches_pid_and_signature() {
        assert!(listing_contains(LISTING, 812, "fssp run"));
        assert!(!listing_contains(LISTING, 9000, "fssp run"));
        assert!(!listing_contains(LISTING, 81, "fssp run"));
        assert!(!listing_contains(LISTING, 1, "fssp"));
    }

    #[test]
    fn test_current_process_is_visible() {
        let table = PsProcessTable::new("");
        if table.list().is_some() {
            assert!(table.is_running(std::process::id()));
        }
    }
}
