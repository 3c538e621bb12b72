use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use owo_colors::OwoColorize;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::{constants::NOTICE_TTL, utils::log::notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Danger,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Danger => "danger",
        })
    }
}

impl NoticeLevel {
    /// `[level]` colored for a terminal.
    pub fn tag(self) -> String {
        let tag = format!("[{self}]");
        match self {
            NoticeLevel::Info => tag.blue().to_string(),
            NoticeLevel::Success => tag.green().to_string(),
            NoticeLevel::Warning => tag.yellow().to_string(),
            NoticeLevel::Danger => tag.red().bold().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub expires: Instant,
}

#[derive(Debug, Default)]
struct Board {
    next_id: u64,
    live: Vec<Notice>,
}

/// Transient user-facing messages. Clones share the same board.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    board: Arc<Mutex<Board>>,
    ttl: Duration,
    desktop: Arc<AtomicBool>,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(false)
    }
}

impl NoticeBoard {
    pub fn new(desktop: bool) -> Self {
        Self {
            board: Arc::default(),
            ttl: NOTICE_TTL,
            desktop: Arc::new(AtomicBool::new(desktop)),
        }
    }

    /// Applies to every clone of this board.
    pub fn set_desktop(&self, desktop: bool) {
        self.desktop.store(desktop, Ordering::Relaxed);
    }

    pub fn desktop(&self) -> bool {
        self.desktop.load(Ordering::Relaxed)
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NoticeLevel::Info | NoticeLevel::Success => info!("{message}"),
            NoticeLevel::Warning => warn!("{message}"),
            NoticeLevel::Danger => error!("{message}"),
        }

        if self.desktop.load(Ordering::Relaxed) {
            notification(&message);
        }

        let mut board = self.board.lock();
        board.next_id += 1;
        let id = board.next_id;
        board.live.push(Notice {
            id,
            level,
            message,
            expires: Instant::now() + self.ttl,
        });
        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Warning, message)
    }

    pub fn danger(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Danger, message)
    }

    /// Notices that have not expired yet, oldest first.
    pub fn live(&self) -> Vec<Notice> {
        let now = Instant::now();
        let mut board = self.board.lock();
        board.live.retain(|n| n.expires > now);
        board.live.clone()
    }

    /// Every notice pushed after `id`, expired or not. Expired notices up to
    /// `id` are dropped.
    pub fn since(&self, id: u64) -> Vec<Notice> {
        let now = Instant::now();
        let mut board = self.board.lock();
        board.live.retain(|n| n.id > id || n.expires > now);
        board.live.iter().filter(|n| n.id > id).cloned().collect()
    }

    pub fn last_id(&self) -> u64 {
        self.board.lock().next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn notices_expire_after_ttl() {
        let board = NoticeBoard::default();
        board.warning("first");
        tokio::time::advance(Duration::from_secs(3)).await;
        board.info("second");

        assert_eq!(board.live().len(), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        let live = board.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].message, "second");

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(board.live().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn since_keeps_expired_notices() {
        let board = NoticeBoard::default();
        let first = board.danger("boom");
        board.success("done");
        tokio::time::advance(Duration::from_secs(10)).await;

        let after = board.since(first);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].message, "done");
        assert_eq!(board.last_id(), first + 1);
        assert!(board.live().is_empty());
    }
}
