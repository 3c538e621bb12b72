use std::{fs, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use notify_rust::Notification;
use tracing::warn;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::{
    fmt::{self},
    registry::LookupSpan,
    reload,
};

use crate::constants::NAMESPACE;

type BoxedLayer<S> =
    Box<dyn tracing_subscriber::layer::Layer<S> + Send + Sync + 'static>;
pub type LogHandle<S> = reload::Handle<Option<BoxedLayer<S>>, S>;

const MAX_LOG_FILES: usize = 15;
const MAX_LOG_AGE_DAYS: i64 = 7;

pub struct LogManager {
    pub state_dir: PathBuf,
}

impl LogManager {
    pub fn init() -> Self {
        let state_dir = std::env::var("XDG_STATE_HOME")
            .map(|state| PathBuf::from(state).join(NAMESPACE))
            .or_else(|_| {
                std::env::var("HOME").map(|home| {
                    PathBuf::from(home).join(".local/state").join(NAMESPACE)
                })
            })
            .unwrap_or_else(|_| std::env::temp_dir().join(NAMESPACE));

        let _ = fs::create_dir_all(&state_dir);
        Self { state_dir }
    }

    pub fn generate_log_name() -> String {
        let pid = std::process::id();
        let now = Utc::now().format("%Y%m%d-%H%M%S");
        format!("{NAMESPACE}.{pid}.{now}.log")
    }

    pub fn setup_logging<S>(&self, handle: &LogHandle<S>) -> PathBuf
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        self.cleanup_old_logs();
        let log_name = Self::generate_log_name();
        let log_path = self.state_dir.join(&log_name);

        let file_appender =
            tracing_appender::rolling::never(&self.state_dir, &log_name);

        let layer = fmt::layer()
            .compact()
            .with_ansi(false)
            .with_writer(file_appender)
            .boxed();

        let _ = handle.modify(|l| *l = Some(layer));
        log_path
    }

    fn cleanup_old_logs(&self) {
        let Ok(entries) = fs::read_dir(&self.state_dir) else {
            return;
        };
        let now = Utc::now();
        let expiration = Duration::days(MAX_LOG_AGE_DAYS);

        let mut log_files: Vec<(PathBuf, DateTime<Utc>)> = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(NAMESPACE))
            .filter_map(|e| {
                let path = e.path();
                let meta = e.metadata().ok()?;
                let modified = meta.modified().ok()?.into();
                Some((path, modified))
            })
            .collect();

        log_files.retain(|(path, modified)| {
            if now.signed_duration_since(*modified) > expiration {
                let _ = fs::remove_file(path);
                false
            } else {
                true
            }
        });

        if log_files.len() > MAX_LOG_FILES {
            log_files.sort_by_key(|&(_, modified)| modified);
            let to_remove = log_files.len() - MAX_LOG_FILES;
            for (path, _) in &log_files[..to_remove] {
                let _ = fs::remove_file(path);
            }
        }
    }
}

pub fn get_default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "info,capdeck=debug,capdeck_api=debug".into()
        } else {
            "error,capdeck=info,capdeck_api=info".into()
        }
    })
}

pub fn notification(msg: &str) {
    if let Err(e) = Notification::new().summary(NAMESPACE).body(msg).show() {
        warn!("Failed to send notification: {e:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_names_carry_namespace_and_pid() {
        let name = LogManager::generate_log_name();
        let pid = format!(".{}.", std::process::id());
        assert!(name.starts_with(NAMESPACE));
        assert!(name.contains(&pid));
        assert!(name.ends_with(".log"));
    }
}
