// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker registration
//!
//! Tracks which version is installing, waiting and active, how many pages
//! are open, and publishes every transition to page-side observers.

use satchel_core::{RegistrationEvent, SatchelError, SatchelResult, WorkerVersionState};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// One worker version in a registration slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerVersion {
    pub version: String,
    pub state: WorkerVersionState,
}

/// Registration shared by every version of the worker
pub type SharedRegistration = Arc<Mutex<Registration>>;

/// Installing / waiting / active slots for one scope
#[derive(Debug)]
pub struct Registration {
    installing: Option<WorkerVersion>,
    waiting: Option<WorkerVersion>,
    active: Option<WorkerVersion>,
    /// Open pages controlled by the active version
    clients: usize,
    skip_waiting: bool,
    event_tx: mpsc::UnboundedSender<RegistrationEvent>,
}

impl Registration {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RegistrationEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                installing: None,
                waiting: None,
                active: None,
                clients: 0,
                skip_waiting: false,
                event_tx,
            },
            event_rx,
        )
    }

    pub fn shared() -> (SharedRegistration, mpsc::UnboundedReceiver<RegistrationEvent>) {
        let (registration, rx) = Self::new();
        (Arc::new(Mutex::new(registration)), rx)
    }

    pub fn installing(&self) -> Option<&WorkerVersion> {
        self.installing.as_ref()
    }

    pub fn waiting(&self) -> Option<&WorkerVersion> {
        self.waiting.as_ref()
    }

    pub fn active(&self) -> Option<&WorkerVersion> {
        self.active.as_ref()
    }

    pub fn clients(&self) -> usize {
        self.clients
    }

    /// A new version was found and starts installing
    pub fn update(&mut self, version: &str) {
        if let Some(mut previous) = self.installing.take() {
            previous.state = WorkerVersionState::Redundant;
            self.emit_state(&previous);
        }
        self.skip_waiting = false;
        self.send(RegistrationEvent::UpdateFound {
            version: version.to_string(),
        });
        let worker = WorkerVersion {
            version: version.to_string(),
            state: WorkerVersionState::Installing,
        };
        self.emit_state(&worker);
        self.installing = Some(worker);
    }

    /// `version` finished precaching and now waits
    ///
    /// Fails when `version` no longer holds the installing slot, either
    /// because a newer version replaced it or because it never started.
    pub fn install_complete(&mut self, version: &str) -> SatchelResult<()> {
        let mut worker = self.take_installing(version)?;

        if let Some(mut replaced) = self.waiting.take() {
            replaced.state = WorkerVersionState::Redundant;
            self.emit_state(&replaced);
        }

        worker.state = WorkerVersionState::Waiting;
        self.emit_state(&worker);
        self.waiting = Some(worker);
        Ok(())
    }

    /// `version` failed to install; it never becomes active
    ///
    /// A superseded version has already been marked redundant, so the slot
    /// is left to whoever holds it now.
    pub fn install_failed(&mut self, version: &str) {
        if let Ok(mut worker) = self.take_installing(version) {
            worker.state = WorkerVersionState::Redundant;
            self.emit_state(&worker);
        }
    }

    fn take_installing(&mut self, version: &str) -> SatchelResult<WorkerVersion> {
        match self.installing.take() {
            Some(worker) if worker.version == version => Ok(worker),
            Some(other) => {
                let err = SatchelError::InvalidState(format!("{version} was superseded by {}", other.version));
                self.installing = Some(other);
                Err(err)
            }
            None => Err(SatchelError::InvalidState(format!("{version} is not installing"))),
        }
    }

    /// Let the waiting version activate without waiting for pages to close
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
    }

    /// Whether the waiting version may take over now
    pub fn can_activate(&self) -> bool {
        self.waiting.is_some() && (self.skip_waiting || self.active.is_none() || self.clients == 0)
    }

    /// Promote the waiting version; the previous active one becomes redundant
    pub fn activate(&mut self) -> SatchelResult<String> {
        let mut worker = self
            .waiting
            .take()
            .ok_or_else(|| SatchelError::InvalidState("no version is waiting".into()))?;

        if let Some(mut old) = self.active.take() {
            old.state = WorkerVersionState::Redundant;
            self.emit_state(&old);
        }

        worker.state = WorkerVersionState::Active;
        self.emit_state(&worker);
        let version = worker.version.clone();
        self.active = Some(worker);
        self.skip_waiting = false;
        Ok(version)
    }

    /// Take control of open pages
    pub fn claim(&mut self) -> SatchelResult<()> {
        let version = self
            .active
            .as_ref()
            .map(|w| w.version.clone())
            .ok_or_else(|| SatchelError::InvalidState("no active version to claim clients".into()))?;
        tracing::info!(%version, clients = self.clients, "Claimed clients");
        self.send(RegistrationEvent::ControllerChange { version });
        Ok(())
    }

    pub fn client_opened(&mut self) {
        self.clients += 1;
    }

    pub fn client_closed(&mut self) {
        self.clients = self.clients.saturating_sub(1);
    }

    fn emit_state(&self, worker: &WorkerVersion) {
        tracing::info!(version = %worker.version, state = ?worker.state, "Worker state changed");
        self.send(RegistrationEvent::StateChange {
            version: worker.version.clone(),
            state: worker.state,
        });
    }

    fn send(&self, event: RegistrationEvent) {
        // No observer is fine, the worker runs headless in the CLI
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<RegistrationEvent>) -> Vec<RegistrationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn state(version: &str, state: WorkerVersionState) -> RegistrationEvent {
        RegistrationEvent::StateChange {
            version: version.into(),
            state,
        }
    }

    #[test]
    fn test_first_install_activates_immediately() {
        let (mut reg, mut rx) = Registration::new();
        reg.client_opened();

        reg.update("v1");
        reg.install_complete("v1").unwrap();
        assert!(reg.can_activate());
        assert_eq!(reg.activate().unwrap(), "v1");
        reg.claim().unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                RegistrationEvent::UpdateFound { version: "v1".into() },
                state("v1", WorkerVersionState::Installing),
                state("v1", WorkerVersionState::Waiting),
                state("v1", WorkerVersionState::Active),
                RegistrationEvent::ControllerChange { version: "v1".into() },
            ]
        );
    }

    #[test]
    fn test_update_waits_while_clients_open() {
        let (mut reg, mut rx) = Registration::new();
        reg.update("v1");
        reg.install_complete("v1").unwrap();
        reg.activate().unwrap();
        reg.client_opened();
        drain(&mut rx);

        reg.update("v2");
        reg.install_complete("v2").unwrap();
        assert!(!reg.can_activate());
        assert_eq!(reg.waiting().unwrap().version, "v2");
        assert_eq!(reg.active().unwrap().version, "v1");

        reg.skip_waiting();
        assert!(reg.can_activate());
        reg.activate().unwrap();

        let events = drain(&mut rx);
        assert!(events.contains(&state("v1", WorkerVersionState::Redundant)));
        assert!(events.contains(&state("v2", WorkerVersionState::Active)));
        assert!(reg.waiting().is_none());
    }

    #[test]
    fn test_closing_last_client_allows_activation() {
        let (mut reg, _rx) = Registration::new();
        reg.update("v1");
        reg.install_complete("v1").unwrap();
        reg.activate().unwrap();
        reg.client_opened();
        reg.client_opened();

        reg.update("v2");
        reg.install_complete("v2").unwrap();
        reg.client_closed();
        assert!(!reg.can_activate());
        reg.client_closed();
        assert!(reg.can_activate());
    }

    #[test]
    fn test_failed_install_is_redundant() {
        let (mut reg, mut rx) = Registration::new();
        reg.update("v1");
        reg.install_failed("v1");

        assert!(reg.installing().is_none());
        assert!(reg.install_complete("v1").is_err());
        assert!(drain(&mut rx).contains(&state("v1", WorkerVersionState::Redundant)));
    }

    #[test]
    fn test_superseded_version_cannot_take_the_slot() {
        let (mut reg, mut rx) = Registration::new();
        reg.update("v1");
        reg.update("v2");
        assert!(drain(&mut rx).contains(&state("v1", WorkerVersionState::Redundant)));

        assert!(matches!(reg.install_complete("v1"), Err(SatchelError::InvalidState(_))));
        assert_eq!(reg.installing().unwrap().version, "v2");
        assert!(reg.waiting().is_none());

        reg.install_failed("v1");
        assert_eq!(reg.installing().unwrap().version, "v2");

        reg.install_failed("v2");
        assert!(reg.installing().is_none());
        assert!(reg.waiting().is_none());
        assert!(!reg.can_activate());
    }

    #[test]
    fn test_activate_without_waiting_is_invalid() {
        let (mut reg, _rx) = Registration::new();
        assert!(matches!(reg.activate(), Err(SatchelError::InvalidState(_))));
        assert!(reg.claim().is_err());
    }

    #[test]
    fn test_dropped_observer_does_not_break_transitions() {
        let (mut reg, rx) = Registration::new();
        drop(rx);
        reg.update("v1");
        reg.install_complete("v1").unwrap();
        assert_eq!(reg.activate().unwrap(), "v1");
    }
}
