use std::time::Duration;

pub const NAMESPACE: &str = "capdeck";

// backend
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

// timing
pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);
pub const STATUS_SETTLE: Duration = Duration::from_secs(1);
pub const NOTICE_TTL: Duration = Duration::from_secs(5);
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_millis(500);
