//! Connectivity banners
//!
//! Going offline shows a banner until the connection returns. Coming back
//! shows a short-lived "back online" banner and asks for the queued
//! submissions to be synced.

use satchel_core::SyncKind;
use std::time::{Duration, Instant};

use crate::action::ClientAction;

/// How long the back-online banner stays up
pub const BACK_ONLINE_DURATION: Duration = Duration::from_secs(3);

/// Queues replayed when the connection returns
pub const RECONNECT_SYNC: [SyncKind; 2] = SyncKind::ALL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Offline,
    BackOnline,
}

#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: bool,
    banner: Option<(Banner, Instant)>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        Self { online, banner: None }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Record a connectivity change seen at `now`
    pub fn set_online(&mut self, online: bool, now: Instant) -> Vec<ClientAction> {
        if online == self.online {
            return Vec::new();
        }
        self.online = online;

        if online {
            tracing::info!("Back online");
            self.banner = Some((Banner::BackOnline, now));
            vec![
                ClientAction::ShowBanner(Banner::BackOnline),
                ClientAction::RegisterSync(RECONNECT_SYNC.to_vec()),
            ]
        } else {
            tracing::info!("Connection lost");
            self.banner = Some((Banner::Offline, now));
            vec![ClientAction::ShowBanner(Banner::Offline)]
        }
    }

    /// Banner visible at `now`
    pub fn banner(&self, now: Instant) -> Option<Banner> {
        match self.banner {
            Some((Banner::BackOnline, shown)) if now.duration_since(shown) >= BACK_ONLINE_DURATION => None,
            Some((banner, _)) => Some(banner),
            None => None,
        }
    }

    /// Drop an expired banner; returns the hide action when one expired
    pub fn tick(&mut self, now: Instant) -> Vec<ClientAction> {
        if self.banner.is_some() && self.banner(now).is_none() {
            self.banner = None;
            return vec![ClientAction::HideBanner];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_banner_stays() {
        let mut monitor = ConnectivityMonitor::new(true);
        let t0 = Instant::now();

        assert_eq!(monitor.set_online(false, t0), vec![ClientAction::ShowBanner(Banner::Offline)]);
        assert_eq!(monitor.banner(t0 + Duration::from_secs(600)), Some(Banner::Offline));
    }

    #[test]
    fn test_back_online_expires_and_syncs() {
        let mut monitor = ConnectivityMonitor::new(false);
        let t0 = Instant::now();

        let actions = monitor.set_online(true, t0);
        let Some(ClientAction::RegisterSync(kinds)) = actions.get(1) else {
            panic!("no sync requested: {actions:?}");
        };
        let tags: Vec<_> = kinds.iter().map(|k| k.tag()).collect();
        assert_eq!(tags, vec!["urgent-registration-sync", "contact-form-sync"]);
        assert_eq!(monitor.banner(t0 + Duration::from_secs(2)), Some(Banner::BackOnline));
        assert_eq!(monitor.banner(t0 + Duration::from_secs(3)), None);

        assert_eq!(monitor.tick(t0 + Duration::from_secs(3)), vec![ClientAction::HideBanner]);
        assert!(monitor.tick(t0 + Duration::from_secs(4)).is_empty());
    }

    #[test]
    fn test_repeated_state_is_ignored() {
        let mut monitor = ConnectivityMonitor::new(true);
        assert!(monitor.set_online(true, Instant::now()).is_empty());
    }
}
