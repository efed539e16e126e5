use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::canvas::ClientConfig;
use crate::cli::{CanvasArgs, StateArgs, SyncArgs};
use crate::download::SyncSettings;
use crate::retry::RetryConfig;
use crate::types::LogParsePolicy;

/// Default sync log file name inside the download directory.
pub const LOG_FILE_NAME: &str = ".files";

/// Cap on the exponential retry delay.
const MAX_RETRY_DELAY_SECS: u64 = 60;

/// Validated connection settings.
pub struct RemoteConfig {
    pub url: String,
    pub token: String,
    pub client: ClientConfig,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("client", &self.client)
            .finish()
    }
}

impl RemoteConfig {
    pub fn from_args(args: &CanvasArgs) -> anyhow::Result<Self> {
        let url = non_empty(args.url.as_deref())
            .context("Canvas URL is required (--url or CANVAS_URL)")?;
        let token = non_empty(args.token.as_deref())
            .context("Canvas access token is required (--token or CANVAS_TOKEN)")?;
        if args.page_size == 0 {
            anyhow::bail!("--page-size must be at least 1");
        }

        Ok(Self {
            url: url.to_string(),
            token: token.to_string(),
            client: ClientConfig {
                page_size: args.page_size,
                timeout: Duration::from_secs(args.timeout),
                retry: RetryConfig {
                    max_retries: args.max_retries,
                    base_delay_secs: args.retry_delay,
                    max_delay_secs: MAX_RETRY_DELAY_SECS.max(args.retry_delay),
                },
            },
        })
    }
}

/// Download root and sync log path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLocation {
    pub root: PathBuf,
    pub log_path: PathBuf,
}

impl StateLocation {
    pub fn from_args(args: &StateArgs) -> anyhow::Result<Self> {
        let directory = non_empty(args.directory.as_deref())
            .context("Download directory is required (--directory or SAVE_TO)")?;
        let root = expand_tilde(directory);
        let log_path = match non_empty(args.log_file.as_deref()) {
            Some(log_file) => expand_tilde(log_file),
            None => root.join(LOG_FILE_NAME),
        };
        Ok(Self { root, log_path })
    }

    /// Lock file guarding the sync log against concurrent runs.
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .log_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| LOG_FILE_NAME.into());
        name.push(".lock");
        self.log_path.with_file_name(name)
    }
}

/// Everything a `sync` run needs.
#[derive(Debug)]
pub struct Config {
    pub remote: RemoteConfig,
    pub location: StateLocation,
    pub courses: HashSet<String>,
    pub log_parse_policy: LogParsePolicy,
}

impl Config {
    pub fn from_cli(args: SyncArgs) -> anyhow::Result<Self> {
        Ok(Self {
            remote: RemoteConfig::from_args(&args.canvas)?,
            location: StateLocation::from_args(&args.state)?,
            courses: parse_course_filter(args.courses.as_deref().unwrap_or_default()),
            log_parse_policy: args.log_parse_policy,
        })
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            root: self.location.root.clone(),
            log_path: self.location.log_path.clone(),
            courses: self.courses.clone(),
            log_parse_policy: self.log_parse_policy,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Split a comma-separated course list, trimming entries and dropping
/// empty ones. `"MATH101, PHYS201"` and `"MATH101,PHYS201,"` are equivalent.
pub fn parse_course_filter(s: &str) -> HashSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// `path` with the home directory shortened to `~`, for messages.
pub fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_args() -> CanvasArgs {
        CanvasArgs {
            url: Some("https://canvas.example.edu".into()),
            token: Some("secret".into()),
            page_size: 100,
            timeout: 30,
            max_retries: 2,
            retry_delay: 5,
        }
    }

    fn state_args(directory: &str) -> StateArgs {
        StateArgs {
            directory: Some(directory.into()),
            log_file: None,
        }
    }

    #[test]
    fn test_expand_tilde_with_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/canvas"), home.join("canvas"));
            assert_eq!(expand_tilde("~"), home);
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/~/path"), PathBuf::from("rel/~/path"));
    }

    #[test]
    fn test_parse_course_filter() {
        let filter = parse_course_filter(" MATH101, PHYS201 ,,");
        assert_eq!(filter.len(), 2);
        assert!(filter.contains("MATH101"));
        assert!(filter.contains("PHYS201"));
    }

    #[test]
    fn test_parse_course_filter_blank_is_empty() {
        assert!(parse_course_filter("").is_empty());
        assert!(parse_course_filter("  ,  ").is_empty());
    }

    #[test]
    fn test_log_path_defaults_inside_directory() {
        let location = StateLocation::from_args(&state_args("/data/canvas")).unwrap();
        assert_eq!(location.root, PathBuf::from("/data/canvas"));
        assert_eq!(location.log_path, PathBuf::from("/data/canvas/.files"));
        assert_eq!(location.lock_path(), PathBuf::from("/data/canvas/.files.lock"));
    }

    #[test]
    fn test_explicit_log_file() {
        let args = StateArgs {
            directory: Some("/data/canvas".into()),
            log_file: Some("/state/canvas.log".into()),
        };
        let location = StateLocation::from_args(&args).unwrap();
        assert_eq!(location.log_path, PathBuf::from("/state/canvas.log"));
        assert_eq!(location.lock_path(), PathBuf::from("/state/canvas.log.lock"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let args = StateArgs {
            directory: Some("  ".into()),
            log_file: None,
        };
        let err = StateLocation::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("SAVE_TO"));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let mut args = canvas_args();
        args.token = None;
        let err = RemoteConfig::from_args(&args).unwrap_err();
        assert!(err.to_string().contains("CANVAS_TOKEN"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut args = canvas_args();
        args.page_size = 0;
        assert!(RemoteConfig::from_args(&args).is_err());
    }

    #[test]
    fn test_remote_config_maps_retry_and_timeout() {
        let mut args = canvas_args();
        args.max_retries = 4;
        args.retry_delay = 2;
        args.timeout = 10;
        let remote = RemoteConfig::from_args(&args).unwrap();
        assert_eq!(remote.client.retry.max_retries, 4);
        assert_eq!(remote.client.retry.base_delay_secs, 2);
        assert_eq!(remote.client.retry.max_delay_secs, 60);
        assert_eq!(remote.client.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_debug_redacts_token() {
        let remote = RemoteConfig::from_args(&canvas_args()).unwrap();
        let debug = format!("{:?}", remote);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_cli_builds_settings() {
        let args = SyncArgs {
            canvas: canvas_args(),
            state: state_args("/data/canvas"),
            courses: Some("MATH101".into()),
            log_parse_policy: LogParsePolicy::DiscardAll,
        };
        let config = Config::from_cli(args).unwrap();
        let settings = config.sync_settings();
        assert_eq!(settings.root, PathBuf::from("/data/canvas"));
        assert_eq!(settings.log_path, PathBuf::from("/data/canvas/.files"));
        assert!(settings.courses.contains("MATH101"));
        assert_eq!(settings.log_parse_policy, LogParsePolicy::DiscardAll);
    }
}
