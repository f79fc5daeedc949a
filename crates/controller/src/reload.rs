//! Configuration channel: picks up edited targets from the config file
//! without restarting the control loop.
//!
//! A background task polls the file.  When it changes and still validates,
//! the new [`Targets`] are published on a `watch` channel; the control loop
//! copies the latest value between cycles.  Invalid edits are logged and
//! ignored so a typo never reaches the actuators.

use std::time::Duration;

use anyhow::{Context, Result};
use greenhouse_core::Targets;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config;

/// Change detector for one config file.
pub(crate) struct ConfigWatcher {
    path: String,
    /// Contents of the last version seen.
    seen: Option<String>,
}

impl ConfigWatcher {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            seen: None,
        }
    }

    /// `None` if the file is unchanged (or absent); otherwise the parsed
    /// targets or the reason they were rejected.  The first poll reports
    /// whatever the file holds.
    pub(crate) async fn poll(&mut self) -> Option<Result<Targets>> {
        let text = tokio::fs::read_to_string(&self.path).await.ok()?;
        if self.seen.as_deref() == Some(text.as_str()) {
            return None;
        }

        let parsed = config::parse(&text)
            .map(|cfg| cfg.targets())
            .with_context(|| format!("invalid config: {}", self.path));
        self.seen = Some(text);
        Some(parsed)
    }
}

/// Start the reload task.  The receiver starts out holding `initial`; the
/// first poll re-reads the file, so an edit made after startup loading is
/// still picked up.
pub(crate) fn spawn(path: String, every: Duration, initial: Targets) -> watch::Receiver<Targets> {
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        let mut watcher = ConfigWatcher::new(path);

        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match watcher.poll().await {
                None => {}
                Some(Ok(targets)) => {
                    if *tx.borrow() != targets {
                        info!(
                            temp_c = targets.temp_c,
                            humidity_pct = targets.humidity_pct,
                            light_hours = targets.light_hours,
                            "targets reloaded"
                        );
                        if tx.send(targets).is_err() {
                            return; // control loop gone
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("config reload rejected, keeping previous targets: {e:#}");
                }
            }
        }
    });

    rx
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gh-reload-{}-{name}.toml", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_reports_nothing() {
        let mut w = ConfigWatcher::new("/nonexistent/greenhouse.toml");
        assert!(w.poll().await.is_none());
    }

    #[tokio::test]
    async fn first_poll_reads_targets() {
        let path = temp_path("first");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\nlight_hours = 8.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        let t = w.poll().await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(t.temp_c, 21.0);
        assert_eq!(t.light_hours, 8.0);
        assert_eq!(t.humidity_pct, 65.0);
    }

    #[tokio::test]
    async fn unchanged_file_is_quiet() {
        let path = temp_path("quiet");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        assert!(w.poll().await.is_some());
        let second = w.poll().await;
        std::fs::remove_file(&path).ok();

        assert!(second.is_none());
    }

    #[tokio::test]
    async fn invalid_edit_is_rejected() {
        let path = temp_path("invalid");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        w.poll().await.unwrap().unwrap();
        std::fs::write(&path, "[targets]\nlight_hours = 48.0\nhumidity_pct = 50.0\n").unwrap();
        let res = w.poll().await;
        std::fs::remove_file(&path).ok();

        let err = res.unwrap().unwrap_err();
        assert!(format!("{err:#}").contains("light_hours 48 out of range"));
    }

    #[tokio::test]
    async fn edit_after_first_poll_is_reported() {
        let path = temp_path("edit");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        w.poll().await.unwrap().unwrap();
        std::fs::write(&path, "[targets]\ntemp_c = 23.5\nhumidity_pct = 70.0\n").unwrap();
        let t = w.poll().await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(t.temp_c, 23.5);
        assert_eq!(t.humidity_pct, 70.0);
    }

    #[tokio::test]
    async fn same_length_edit_is_reported() {
        let path = temp_path("same-len");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        w.poll().await.unwrap().unwrap();
        std::fs::write(&path, "[targets]\ntemp_c = 23.0\n").unwrap();
        let t = w.poll().await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(t.temp_c, 23.0);
    }

    #[tokio::test]
    async fn first_poll_sees_edit_made_after_startup_load() {
        let path = temp_path("startup");
        std::fs::write(&path, "[targets]\ntemp_c = 21.0\n").unwrap();
        let loaded = config::load(path.to_str().unwrap()).unwrap().targets();
        std::fs::write(&path, "[targets]\ntemp_c = 24.0\n").unwrap();

        let mut w = ConfigWatcher::new(path.to_str().unwrap());
        let t = w.poll().await.unwrap().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.temp_c, 21.0);
        assert_ne!(t, loaded);
        assert_eq!(t.temp_c, 24.0);
    }
}
