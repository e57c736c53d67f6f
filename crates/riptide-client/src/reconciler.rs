//! Foreground/background reconnect workaround.
//!
//! Android can silently drop the socket when the application is backgrounded,
//! leaving the vendor client convinced it is still connected. The reconciler
//! forces an explicit disconnect on background and reconnect on foreground
//! so the subscription state is rebuilt from a socket that actually exists.
//! On platforms without the defect it does nothing at all.

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::client::Client;

/// Application lifecycle state, as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// App is in the foreground and interactive.
    Active,
    /// App is transitioning or partially obscured.
    Inactive,
    /// App is in the background.
    Background,
}

/// Host platform the application runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Android. Exhibits the silent background socket loss.
    Android,
    /// iOS.
    Ios,
    /// Web.
    Web,
    /// Desktop.
    Desktop,
}

impl Platform {
    /// Whether this platform silently drops the socket when backgrounded.
    fn drops_socket_in_background(self) -> bool {
        matches!(self, Self::Android)
    }
}

/// Maps app-lifecycle transitions onto [`Client::connect`] /
/// [`Client::disconnect`].
///
/// Idempotent by construction: connect/disconnect are idempotent at the
/// transport layer, so repeated lifecycle signals are harmless.
pub struct LifecycleReconciler {
    task: Option<JoinHandle<()>>,
}

impl LifecycleReconciler {
    /// Start reconciling `states` against the client's connection.
    ///
    /// On platforms without the background defect the receiver is dropped
    /// immediately and an inert handle is returned. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(
        client: Arc<Client>,
        platform: Platform,
        mut states: mpsc::Receiver<AppState>,
    ) -> Self {
        if !platform.drops_socket_in_background() {
            return Self { task: None };
        }

        let task = tokio::spawn(async move {
            while let Some(state) = states.recv().await {
                let result = match state {
                    AppState::Active => client.connect().await,
                    AppState::Inactive | AppState::Background => client.disconnect().await,
                };
                if let Err(error) = result {
                    // Best effort: the next lifecycle transition retries.
                    tracing::warn!(?state, %error, "lifecycle reconnect workaround failed");
                }
            }
        });

        Self { task: Some(task) }
    }

    /// Whether a reconciliation task is running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop reconciling.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for LifecycleReconciler {
    fn drop(&mut self) {
        self.stop();
    }
}
