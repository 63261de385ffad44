use anyhow::{anyhow, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub api_port: u16,
    pub paths: ForumPaths,
    pub feed: FeedConfig,
    pub votes: VoteConfig,
}

impl ForumConfig {
    pub fn from_env() -> Result<Self> {
        let paths = match env::var("FORUMFEED_HOME") {
            Ok(raw) if !raw.trim().is_empty() => ForumPaths::from_base_dir(raw.trim())?,
            _ => ForumPaths::discover()?,
        };
        let api_port = parse_env("FORUMFEED_API_PORT").unwrap_or(8080);
        Ok(Self {
            api_port,
            paths,
            feed: FeedConfig::from_env(),
            votes: VoteConfig::from_env(),
        })
    }

    pub fn new(api_port: u16, paths: ForumPaths) -> Self {
        Self {
            api_port,
            paths,
            feed: FeedConfig::default(),
            votes: VoteConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    /// Hard cap on the number of posts returned per page.
    pub max_page_size: usize,
    /// Page size used when the caller does not ask for one.
    pub default_page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_page_size: 50,
            default_page_size: 15,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_page_size = parse_env::<usize>("FORUMFEED_MAX_PAGE_SIZE")
            .filter(|size| *size > 0)
            .unwrap_or(defaults.max_page_size);
        let default_page_size = parse_env::<usize>("FORUMFEED_DEFAULT_PAGE_SIZE")
            .filter(|size| *size > 0)
            .unwrap_or(defaults.default_page_size)
            .min(max_page_size);
        Self {
            max_page_size,
            default_page_size,
        }
    }

    /// Clamps a requested page size into `1..=max_page_size`.
    pub fn clamp_limit(&self, requested: Option<i64>) -> usize {
        let max = self.max_page_size.max(1);
        match requested {
            None => self.default_page_size.clamp(1, max),
            Some(raw) if raw < 1 => 1,
            Some(raw) => usize::try_from(raw).unwrap_or(max).min(max),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VoteConfig {
    /// Attempts made at a vote transition before a storage conflict is surfaced.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

impl VoteConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = parse_env::<u32>("FORUMFEED_VOTE_MAX_ATTEMPTS")
            .filter(|attempts| *attempts > 0)
            .unwrap_or(defaults.max_attempts);
        let retry_backoff = parse_env::<u64>("FORUMFEED_VOTE_BACKOFF_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_backoff);
        Self {
            max_attempts,
            retry_backoff,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForumPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl ForumPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("forumfeed.db");
        let logs_dir = base.join("logs");
        Ok(Self {
            base,
            data_dir,
            db_path,
            logs_dir,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_bounds_requests() {
        let feed = FeedConfig::default();
        assert_eq!(feed.clamp_limit(None), 15);
        assert_eq!(feed.clamp_limit(Some(10)), 10);
        assert_eq!(feed.clamp_limit(Some(500)), 50);
        assert_eq!(feed.clamp_limit(Some(0)), 1);
        assert_eq!(feed.clamp_limit(Some(-7)), 1);
    }

    #[test]
    fn paths_derive_from_base() {
        let paths = ForumPaths::from_base_dir("/tmp/forum").unwrap();
        assert_eq!(paths.db_path, PathBuf::from("/tmp/forum/data/forumfeed.db"));
        assert_eq!(paths.logs_dir, PathBuf::from("/tmp/forum/logs"));
    }
}
