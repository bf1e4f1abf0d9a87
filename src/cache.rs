use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use crate::cli::ClearCacheArgs;
use crate::config;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    fetched_at: DateTime<Utc>,
    body: String,
}

/// On-disk page cache: one JSON file per URL, content-addressed by the SHA-256
/// of the URL. Entries expire after a TTL; expired or unreadable entries are
/// deleted on access and treated as misses.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl PageCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = sha2::Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Fresh cached body for `url`, if any. Never fails: cache trouble is a
    /// miss, not an error.
    pub fn get(&self, url: &str) -> Option<String> {
        let path = self.entry_path(url);
        let contents = std::fs::read_to_string(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(url, %err, "dropping unreadable cache entry");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.num_seconds() < 0 || age.num_seconds() as u64 >= self.ttl.as_secs() {
            tracing::debug!(url, "dropping expired cache entry");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(entry.body)
    }

    pub fn put(&self, url: &str, body: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create cache dir: {}", self.dir.display()))?;

        let entry = CacheEntry {
            fetched_at: Utc::now(),
            body: body.to_owned(),
        };
        let json = serde_json::to_string(&entry).context("serialize cache entry")?;

        let path = self.entry_path(url);
        std::fs::write(&path, json)
            .with_context(|| format!("write cache entry: {}", path.display()))?;
        Ok(())
    }

    /// Delete every cache entry. Returns how many files were removed.
    pub fn clear(&self) -> anyhow::Result<usize> {
        clear_dir(&self.dir)
    }
}

fn clear_dir(dir: &Path) -> anyhow::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read cache dir: {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read cache dir entry: {}", dir.display()))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("remove cache entry: {}", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}

/// `clear-cache` subcommand.
pub fn run(args: ClearCacheArgs) -> anyhow::Result<()> {
    let settings = config::load(args.config.as_deref()).context("load settings")?;
    let cache_dir = args
        .cache_dir
        .map(PathBuf::from)
        .unwrap_or(settings.cache_dir);

    let removed = clear_dir(&cache_dir)
        .with_context(|| format!("clear cache: {}", cache_dir.display()))?;
    println!("Removed {removed} cached page(s) from {}", cache_dir.display());
    Ok(())
}
