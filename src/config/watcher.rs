//! Configuration file watcher for route hot reload.
//!
//! # Design Decisions
//! - The parent directory is watched so editors that replace the file
//!   (write to temp, rename) are still seen
//! - Bursts of filesystem events are coalesced before the file is read
//! - Only fully valid files are forwarded; a broken edit keeps the current routes

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches one configuration file and yields each valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive; dropping it
    /// stops the watch and, after the last pending reload, the reload task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let path = self.path;
        let update_tx = self.update_tx;
        tracing::info!(path = ?path, "Config watcher started");

        tokio::spawn(async move {
            while event_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while event_rx.try_recv().is_ok() {}

                tracing::info!(path = ?path, "Config file change detected, reloading routes");
                match load_config(&path) {
                    Ok(config) => {
                        if update_tx.send(config).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reload config, keeping current routes")
                    }
                }
            }
        });

        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_valid_edit_is_forwarded_and_invalid_is_dropped() {
        let dir = std::env::temp_dir().join(format!("gateway-watch-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gateway.toml");
        fs::write(&path, "").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&path, "[[routes]]\npath = \"no-slash\"\nservice = \"x\"\nmethods = [\"GET\"]\n").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(updates.try_recv().is_err());

        fs::write(&path, "[[routes]]\npath = \"/users\"\nservice = \"users\"\nmethods = [\"GET\"]\n").unwrap();
        let config = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.routes[0].service, "users");

        let _ = fs::remove_dir_all(&dir);
    }
}
