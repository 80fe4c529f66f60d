//! Message channel between the UI process and the backend.
//!
//! The UI sends [`UiRequest`]s; the backend answers with
//! [`BackendMessage`]s. Both serialize as `{"channel": .., "payload": ..}`
//! objects so a webview bridge can forward them unchanged.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, error, info};
use mapview_core::ConfigDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::overlays::{OverlaySource, discover_configured};
use crate::settings;

/// Request sent from the UI to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum UiRequest {
    /// Ask for the current configuration.
    GetConfig,
    /// Ask for the overlays found under the configured overlay directory.
    GetOverlays,
    /// Persist a configuration and adopt it as current.
    SaveConfig(ConfigDocument),
    /// Load a configuration from another file and adopt it as current.
    OpenConfig(Utf8PathBuf),
}

/// Message sent from the backend to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "camelCase")]
pub enum BackendMessage {
    /// The current configuration.
    SendConfig(ConfigDocument),
    /// Overlays available on disk, ordered by name.
    OverlaysToBrowser(Vec<OverlaySource>),
    /// A configuration file could not be loaded or saved.
    ConfigError(String),
}

/// Error ending [`Backend::run`] early.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The UI stopped listening for replies.
    #[error("the UI channel closed while a reply was pending")]
    Disconnected,
}

/// Owner of the current configuration and its backing file.
#[derive(Debug, Clone)]
pub struct Backend {
    config_path: Utf8PathBuf,
    config: ConfigDocument,
}

impl Backend {
    /// A backend whose configuration is loaded from `config_path`, or the
    /// default document when the file is missing or unusable.
    #[must_use]
    pub fn new(config_path: impl Into<Utf8PathBuf>) -> Self {
        let path = config_path.into();
        let config = settings::load_or_default(&path);
        Self::with_config(path, config)
    }

    /// A backend with an explicit starting configuration.
    #[must_use]
    pub fn with_config(config_path: impl Into<Utf8PathBuf>, config: ConfigDocument) -> Self {
        Self {
            config_path: config_path.into(),
            config,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &ConfigDocument {
        &self.config
    }

    /// File the configuration is saved to.
    #[must_use]
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Apply `request`, returning the reply to send, if any.
    ///
    /// A successful save is silent; a failed one is logged and reported.
    pub fn handle(&mut self, request: UiRequest) -> Option<BackendMessage> {
        match request {
            UiRequest::GetConfig => Some(BackendMessage::SendConfig(self.config.clone())),
            UiRequest::GetOverlays => Some(BackendMessage::OverlaysToBrowser(discover_configured(
                self.config.overlay_path.as_deref(),
            ))),
            UiRequest::SaveConfig(document) => {
                match settings::save(&self.config_path, &document) {
                    Ok(()) => {
                        self.config = document;
                        None
                    }
                    Err(failure) => {
                        error!("{failure}");
                        Some(BackendMessage::ConfigError(failure.to_string()))
                    }
                }
            }
            UiRequest::OpenConfig(path) => match settings::load(&path) {
                Ok(document) => {
                    self.config = document;
                    Some(BackendMessage::SendConfig(self.config.clone()))
                }
                Err(failure) => {
                    error!("{failure}");
                    Some(BackendMessage::ConfigError(failure.to_string()))
                }
            },
        }
    }

    /// Serve requests from `requests` until the UI closes the channel.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Disconnected`] when a reply cannot be
    /// delivered.
    pub async fn run(
        &mut self,
        mut requests: mpsc::Receiver<UiRequest>,
        replies: mpsc::Sender<BackendMessage>,
    ) -> Result<(), BackendError> {
        info!("backend serving configuration from {}", self.config_path);
        while let Some(request) = requests.recv().await {
            debug!("backend received {request:?}");
            if let Some(reply) = self.handle(request) {
                replies
                    .send(reply)
                    .await
                    .map_err(|_| BackendError::Disconnected)?;
            }
        }
        info!("UI request channel closed; backend stopping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path")
    }

    #[rstest]
    fn requests_use_channel_names() {
        let json = serde_json::to_value(UiRequest::GetConfig).expect("encode");
        assert_eq!(json, serde_json::json!({ "channel": "getConfig" }));
        let reply = serde_json::to_value(BackendMessage::OverlaysToBrowser(Vec::new()))
            .expect("encode");
        assert_eq!(
            reply,
            serde_json::json!({ "channel": "overlaysToBrowser", "payload": [] })
        );
    }

    #[rstest]
    fn missing_config_file_starts_from_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let backend = Backend::new(utf8(&dir).join("config.json"));
        assert_eq!(backend.config(), &ConfigDocument::default());
    }

    #[rstest]
    fn save_writes_and_adopts_the_document() {
        let dir = TempDir::new().expect("temp dir");
        let path = utf8(&dir).join("config.json");
        let mut backend = Backend::with_config(path.clone(), ConfigDocument::default());
        let document = ConfigDocument {
            map_zoom: 4.0,
            ..ConfigDocument::default()
        };

        assert_eq!(backend.handle(UiRequest::SaveConfig(document.clone())), None);
        assert_eq!(backend.config(), &document);
        assert_eq!(settings::load(&path).expect("reload"), document);
    }

    #[rstest]
    fn failed_save_keeps_the_current_document() {
        let dir = TempDir::new().expect("temp dir");
        let root = utf8(&dir);
        std::fs::write(root.join("blocker"), b"not a directory").expect("write blocker");
        let mut backend =
            Backend::with_config(root.join("blocker").join("config.json"), ConfigDocument::default());
        let document = ConfigDocument {
            map_zoom: 3.0,
            ..ConfigDocument::default()
        };

        let reply = backend.handle(UiRequest::SaveConfig(document));
        assert!(matches!(reply, Some(BackendMessage::ConfigError(_))), "found {reply:?}");
        assert_eq!(backend.config(), &ConfigDocument::default());
    }

    #[rstest]
    fn open_config_reports_unreadable_files() {
        let dir = TempDir::new().expect("temp dir");
        let mut backend = Backend::with_config(utf8(&dir).join("config.json"), ConfigDocument::default());
        let reply = backend.handle(UiRequest::OpenConfig(utf8(&dir).join("absent.json")));
        assert!(matches!(reply, Some(BackendMessage::ConfigError(_))));
    }

    #[tokio::test]
    async fn run_answers_until_the_ui_hangs_up() {
        let dir = TempDir::new().expect("temp dir");
        let root = utf8(&dir);
        std::fs::create_dir(root.join("roads")).expect("mkdir");
        let config = ConfigDocument {
            overlay_path: Some(root.to_string()),
            ..ConfigDocument::default()
        };
        let mut backend = Backend::with_config(root.join("config.json"), config.clone());
        let (request_tx, request_rx) = mpsc::channel(4);
        let (reply_tx, mut reply_rx) = mpsc::channel(4);

        request_tx.send(UiRequest::GetConfig).await.expect("send");
        request_tx.send(UiRequest::GetOverlays).await.expect("send");
        drop(request_tx);
        backend.run(request_rx, reply_tx).await.expect("run");

        assert_eq!(
            reply_rx.recv().await,
            Some(BackendMessage::SendConfig(config))
        );
        assert_eq!(
            reply_rx.recv().await,
            Some(BackendMessage::OverlaysToBrowser(vec![OverlaySource {
                name: "roads".to_owned(),
                path: format!("{root}/roads/{{z}}/{{x}}/{{y}}.png"),
            }]))
        );
        assert_eq!(reply_rx.recv().await, None);
    }

    #[tokio::test]
    async fn run_fails_when_replies_cannot_be_delivered() {
        let dir = TempDir::new().expect("temp dir");
        let mut backend = Backend::with_config(utf8(&dir).join("config.json"), ConfigDocument::default());
        let (request_tx, request_rx) = mpsc::channel(1);
        let (reply_tx, reply_rx) = mpsc::channel(1);
        drop(reply_rx);
        request_tx.send(UiRequest::GetConfig).await.expect("send");
        assert_eq!(
            backend.run(request_rx, reply_tx).await,
            Err(BackendError::Disconnected)
        );
    }
}
