// SPDX-License-Identifier: AGPL-3.0-or-later
//! Page-side coordinator
//!
//! Owns the install prompt, update banner and connectivity banners. It only
//! talks to the worker through registration events and posted messages and
//! never touches the caches.

use chrono::{DateTime, Utc};
use satchel_cache::KeyValueStore;
use satchel_core::{RegistrationEvent, SatchelResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::action::ClientAction;
use crate::connectivity::ConnectivityMonitor;
use crate::platform::{install_instructions, InstallCapabilities, Platform};
use crate::prompt::InstallPromptGate;
use crate::update::UpdateBridge;

pub struct ClientCoordinator {
    caps: Box<dyn InstallCapabilities>,
    prompt: InstallPromptGate,
    update: UpdateBridge,
    connectivity: ConnectivityMonitor,
}

impl ClientCoordinator {
    pub fn new(caps: Box<dyn InstallCapabilities>, store: Arc<dyn KeyValueStore>, online: bool) -> Self {
        Self {
            caps,
            prompt: InstallPromptGate::new(store),
            update: UpdateBridge::new(),
            connectivity: ConnectivityMonitor::new(online),
        }
    }

    pub fn with_prompt_gate(mut self, prompt: InstallPromptGate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn platform(&self) -> Platform {
        self.caps.platform()
    }

    pub fn prompt(&self) -> &InstallPromptGate {
        &self.prompt
    }

    pub fn update(&self) -> &UpdateBridge {
        &self.update
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Manual steps shown when the browser has no install prompt of its own
    pub fn install_instructions(&self) -> Option<&'static [&'static str]> {
        if self.caps.supports_native_install_prompt() {
            None
        } else {
            Some(install_instructions(self.caps.platform()))
        }
    }

    /// Count the visit and decide whether to offer installation
    pub fn on_page_load(&mut self, now: DateTime<Utc>) -> SatchelResult<Vec<ClientAction>> {
        let visits = self.prompt.record_visit()?;
        tracing::debug!(visits, platform = %self.caps.platform(), "Page loaded");

        if self.prompt.should_show(self.caps.as_ref(), now)? {
            self.prompt.mark_prompted(now)?;
            return Ok(vec![ClientAction::ShowInstallPrompt]);
        }
        Ok(Vec::new())
    }

    pub fn dismiss_install(&mut self, now: DateTime<Utc>) -> SatchelResult<()> {
        self.prompt.dismiss(now)
    }

    pub fn app_installed(&mut self) -> SatchelResult<()> {
        self.prompt.mark_installed()
    }

    pub fn on_registration_event(&mut self, event: &RegistrationEvent) -> Vec<ClientAction> {
        self.update.on_event(event)
    }

    /// Handle every event already delivered on the channel
    pub fn drain_events(&mut self, events: &mut mpsc::UnboundedReceiver<RegistrationEvent>) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        while let Ok(event) = events.try_recv() {
            actions.extend(self.update.on_event(&event));
        }
        actions
    }

    pub fn accept_update(&mut self) -> Vec<ClientAction> {
        self.update.accept()
    }

    pub fn dismiss_update(&mut self) -> Vec<ClientAction> {
        self.update.dismiss()
    }

    pub fn set_online(&mut self, online: bool, now: Instant) -> Vec<ClientAction> {
        self.connectivity.set_online(online, now)
    }

    pub fn tick(&mut self, now: Instant) -> Vec<ClientAction> {
        self.connectivity.tick(now)
    }
}
