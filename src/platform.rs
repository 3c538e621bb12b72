use capdeck_api::types::{PlatformInfo, SourceType, SourceTypeOption};

use crate::constants::NAMESPACE;

/// What the panel reports as its user agent when the config has none.
pub fn default_user_agent() -> String {
    format!(
        "{NAMESPACE}/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// A word in the agent string starting with "win" (`Windows`, `Win64`)
/// marks a Windows host. `Darwin` does not count.
pub fn is_windows_agent(user_agent: &str) -> bool {
    user_agent
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word.starts_with("win"))
}

/// Platform guess used when `GET /platform` fails.
pub fn from_user_agent(user_agent: &str) -> PlatformInfo {
    let (platform, capture) = if is_windows_agent(user_agent) {
        ("windows", SourceType::DirectShow)
    } else {
        ("linux", SourceType::V4l2)
    };

    PlatformInfo {
        platform: platform.to_owned(),
        available_source_types: vec![
            SourceTypeOption::new(SourceType::None),
            SourceTypeOption::new(capture),
        ],
    }
}
