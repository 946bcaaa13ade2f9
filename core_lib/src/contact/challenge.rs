//! Anti-bot challenge widget adapter
//!
//! A widget is rendered once per form with an explicit `on_token` callback and is
//! reset after each successful submission. Readiness is a one-shot signal awaited
//! with a bound instead of polled.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

pub type TokenCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetHandle(String);

impl WidgetHandle {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("challenge provider did not become ready in time")]
    NotReady,

    #[error("unknown challenge widget: {0}")]
    UnknownWidget(String),

    #[error("challenge token is empty")]
    EmptyToken,
}

#[async_trait]
pub trait ChallengeWidget: Send + Sync {
    /// Resolves once the provider can render, or fails after `timeout`.
    async fn ready(&self, timeout: Duration) -> Result<(), ChallengeError>;

    fn render(
        &self,
        container: &str,
        site_key: &str,
        on_token: TokenCallback,
    ) -> Result<WidgetHandle, ChallengeError>;

    fn reset(&self, handle: &WidgetHandle);

    /// Called when the owning form goes away.
    fn release(&self, _handle: &WidgetHandle) {}
}

/// One-shot readiness flag.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    pub fn pending() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn ready() -> Self {
        let signal = Self::pending();
        signal.mark_ready();
        signal
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait(&self, timeout: Duration) -> Result<(), ChallengeError> {
        let mut rx = self.tx.subscribe();
        let outcome = tokio::time::timeout(timeout, async move {
            rx.wait_for(|ready| *ready).await.map(|_| ())
        })
        .await;

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) | Err(_) => Err(ChallengeError::NotReady),
        }
    }
}

struct RenderedWidget {
    container: String,
    site_key: String,
    on_token: TokenCallback,
    solved: bool,
}

/// Server-side widget whose tokens arrive from the browser over the HTTP API.
pub struct TokenRelayWidget {
    ready: ReadySignal,
    widgets: RwLock<HashMap<WidgetHandle, RenderedWidget>>,
}

impl TokenRelayWidget {
    pub fn new() -> Self {
        Self::with_ready_signal(ReadySignal::ready())
    }

    pub fn with_ready_signal(ready: ReadySignal) -> Self {
        Self {
            ready,
            widgets: RwLock::new(HashMap::new()),
        }
    }

    pub fn deliver_token(&self, handle: &WidgetHandle, token: &str) -> Result<(), ChallengeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChallengeError::EmptyToken);
        }

        let callback = {
            let mut widgets = self.widgets.write();
            let widget = widgets
                .get_mut(handle)
                .ok_or_else(|| ChallengeError::UnknownWidget(handle.to_string()))?;
            widget.solved = true;
            widget.on_token.clone()
        };

        callback(token.to_string());
        Ok(())
    }

    pub fn is_solved(&self, handle: &WidgetHandle) -> bool {
        self.widgets.read().get(handle).map(|w| w.solved).unwrap_or(false)
    }

    pub fn describe(&self, handle: &WidgetHandle) -> Option<(String, String)> {
        self.widgets
            .read()
            .get(handle)
            .map(|w| (w.container.clone(), w.site_key.clone()))
    }

    pub fn remove(&self, handle: &WidgetHandle) {
        self.widgets.write().remove(handle);
    }

    pub fn rendered_count(&self) -> usize {
        self.widgets.read().len()
    }
}

impl Default for TokenRelayWidget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeWidget for TokenRelayWidget {
    async fn ready(&self, timeout: Duration) -> Result<(), ChallengeError> {
        self.ready.wait(timeout).await
    }

    fn render(
        &self,
        container: &str,
        site_key: &str,
        on_token: TokenCallback,
    ) -> Result<WidgetHandle, ChallengeError> {
        let handle = WidgetHandle::generate();
        self.widgets.write().insert(
            handle.clone(),
            RenderedWidget {
                container: container.to_string(),
                site_key: site_key.to_string(),
                on_token,
                solved: false,
            },
        );
        Ok(handle)
    }

    fn reset(&self, handle: &WidgetHandle) {
        if let Some(widget) = self.widgets.write().get_mut(handle) {
            widget.solved = false;
        }
    }

    fn release(&self, handle: &WidgetHandle) {
        self.remove(handle);
    }
}
