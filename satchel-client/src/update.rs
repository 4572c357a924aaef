//! Update bridge
//!
//! Turns registration events into the update banner, and the user's answer
//! into a skip-waiting message followed by exactly one reload.

use async_trait::async_trait;
use satchel_core::{RegistrationEvent, SatchelResult, WorkerMessage, WorkerVersionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::action::ClientAction;

/// Handle able to ask the platform for a fresh worker script
#[async_trait]
pub trait UpdateCheck: Send + Sync {
    async fn check_for_update(&self) -> SatchelResult<()>;
}

#[derive(Debug, Default)]
pub struct UpdateBridge {
    /// Version announced by `UpdateFound`, still installing
    installing: Option<String>,
    /// Version installed and waiting for the user
    waiting: Option<String>,
    banner_visible: bool,
    accepted: bool,
    reloaded: bool,
}

impl UpdateBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn banner_visible(&self) -> bool {
        self.banner_visible
    }

    pub fn waiting_version(&self) -> Option<&str> {
        self.waiting.as_deref()
    }

    pub fn on_event(&mut self, event: &RegistrationEvent) -> Vec<ClientAction> {
        match event {
            RegistrationEvent::UpdateFound { version } => {
                self.installing = Some(version.clone());
                Vec::new()
            }
            RegistrationEvent::StateChange {
                version,
                state: WorkerVersionState::Waiting,
            } => {
                self.installing = None;
                self.waiting = Some(version.clone());
                self.banner_visible = true;
                vec![ClientAction::ShowUpdateBanner {
                    version: version.clone(),
                }]
            }
            RegistrationEvent::StateChange {
                version,
                state: WorkerVersionState::Redundant,
            } if self.waiting.as_ref() == Some(version) => {
                self.waiting = None;
                self.hide()
            }
            RegistrationEvent::StateChange { .. } => Vec::new(),
            RegistrationEvent::ControllerChange { version } => {
                self.waiting = None;
                let mut actions = self.hide();
                if self.accepted && !self.reloaded {
                    tracing::info!(%version, "New worker in control, reloading");
                    self.reloaded = true;
                    actions.push(ClientAction::Reload);
                }
                actions
            }
        }
    }

    /// The user chose to update now
    pub fn accept(&mut self) -> Vec<ClientAction> {
        if self.waiting.is_none() {
            return Vec::new();
        }
        self.accepted = true;
        vec![ClientAction::PostMessage(WorkerMessage::SkipWaiting)]
    }

    /// The user chose to update later
    pub fn dismiss(&mut self) -> Vec<ClientAction> {
        self.hide()
    }

    fn hide(&mut self) -> Vec<ClientAction> {
        if std::mem::take(&mut self.banner_visible) {
            vec![ClientAction::HideUpdateBanner]
        } else {
            Vec::new()
        }
    }
}

/// Ask for a new worker version every `period` until the handle is aborted
pub fn poll_updates(registration: Arc<dyn UpdateCheck>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately; page load already checked
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = registration.check_for_update().await {
                tracing::debug!(error = %e, "Update check failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn waiting(version: &str) -> RegistrationEvent {
        RegistrationEvent::StateChange {
            version: version.into(),
            state: WorkerVersionState::Waiting,
        }
    }

    #[test]
    fn test_waiting_shows_banner() {
        let mut bridge = UpdateBridge::new();
        assert!(bridge.on_event(&RegistrationEvent::UpdateFound { version: "v2".into() }).is_empty());
        assert_eq!(
            bridge.on_event(&waiting("v2")),
            vec![ClientAction::ShowUpdateBanner { version: "v2".into() }]
        );
        assert!(bridge.banner_visible());
    }

    #[test]
    fn test_accept_then_reload_once() {
        let mut bridge = UpdateBridge::new();
        bridge.on_event(&waiting("v2"));

        assert_eq!(bridge.accept(), vec![ClientAction::PostMessage(WorkerMessage::SkipWaiting)]);

        let change = RegistrationEvent::ControllerChange { version: "v2".into() };
        assert_eq!(
            bridge.on_event(&change),
            vec![ClientAction::HideUpdateBanner, ClientAction::Reload]
        );
        assert!(bridge.on_event(&change).is_empty());
    }

    #[test]
    fn test_controller_change_without_accept_does_not_reload() {
        let mut bridge = UpdateBridge::new();
        let actions = bridge.on_event(&RegistrationEvent::ControllerChange { version: "v1".into() });
        assert!(!actions.contains(&ClientAction::Reload));
    }

    #[test]
    fn test_dismiss_hides_banner() {
        let mut bridge = UpdateBridge::new();
        bridge.on_event(&waiting("v2"));
        assert_eq!(bridge.dismiss(), vec![ClientAction::HideUpdateBanner]);
        assert!(!bridge.banner_visible());
        assert_eq!(bridge.waiting_version(), Some("v2"));
    }

    #[test]
    fn test_accept_without_update_does_nothing() {
        assert!(UpdateBridge::new().accept().is_empty());
    }

    struct CountingCheck(AtomicUsize);

    #[async_trait]
    impl UpdateCheck for CountingCheck {
        async fn check_for_update(&self) -> SatchelResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_checks_each_period() {
        let check = Arc::new(CountingCheck(AtomicUsize::new(0)));
        let handle = poll_updates(check.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(185)).await;
        handle.abort();

        assert_eq!(check.0.load(Ordering::SeqCst), 3);
    }
}
