use std::path::PathBuf;
use std::time::Duration;

use crate::gate::FailPolicy;

/// Runtime settings, derived from env with defaults matching the browser app.
#[derive(Clone, Debug)]
pub struct Config {
    /// `None` keeps everything in process memory.
    pub data_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    pub page_size: usize,
    pub max_images: usize,
    pub verification_policy: FailPolicy,
    pub nsfw_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            poll_interval: Duration::from_secs(5),
            page_size: 8,
            max_images: 5,
            verification_policy: FailPolicy::Open,
            nsfw_threshold: 0.5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        }
        let d = Self::default();
        let data_dir = std::env::var("REWEAR_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let fail_open = parse_env("REWEAR_VERIFY_FAIL_OPEN", true);
        Self {
            data_dir,
            poll_interval: Duration::from_secs(parse_env("REWEAR_POLL_INTERVAL_SECS", d.poll_interval.as_secs())),
            page_size: parse_env("REWEAR_PAGE_SIZE", d.page_size).max(1),
            max_images: parse_env("REWEAR_MAX_IMAGES", d.max_images).max(1),
            verification_policy: if fail_open { FailPolicy::Open } else { FailPolicy::Closed },
            nsfw_threshold: parse_env("REWEAR_NSFW_THRESHOLD", d.nsfw_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn env_overrides_defaults() {
        std::env::set_var("REWEAR_POLL_INTERVAL_SECS", "2");
        std::env::set_var("REWEAR_PAGE_SIZE", "0");
        std::env::set_var("REWEAR_VERIFY_FAIL_OPEN", "false");
        std::env::remove_var("REWEAR_DATA_DIR");
        let cfg = Config::from_env();
        assert_eq!(cfg.poll_interval, Duration::from_secs(2));
        assert_eq!(cfg.page_size, 1);
        assert_eq!(cfg.verification_policy, FailPolicy::Closed);
        assert!(cfg.data_dir.is_none());
        assert_eq!(cfg.max_images, 5);
        for k in ["REWEAR_POLL_INTERVAL_SECS", "REWEAR_PAGE_SIZE", "REWEAR_VERIFY_FAIL_OPEN"] {
            std::env::remove_var(k);
        }
    }
}
