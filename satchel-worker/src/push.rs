//! Push messages and notification clicks

use serde::Deserialize;
use url::Url;

pub const DEFAULT_BODY: &str = "Neuigkeiten aus der Kita";
pub const DEFAULT_ICON: &str = "/logo.png";

/// Notification shown for a push message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// Opened when the notification is clicked
    pub target: Url,
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    icon: Option<String>,
    url: Option<String>,
}

/// Build a notification from a raw push payload
///
/// Missing, empty or malformed payloads get the default text. A payload
/// `url` is only honoured when it resolves to the worker's own origin.
pub fn notification_for(payload: Option<&[u8]>, origin: &Url, app_name: &str) -> Notification {
    let parsed = match payload {
        Some(raw) if !raw.is_empty() => serde_json::from_slice::<PushPayload>(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Malformed push payload, using defaults");
            PushPayload::default()
        }),
        _ => PushPayload::default(),
    };

    let target = parsed
        .url
        .as_deref()
        .and_then(|raw| origin.join(raw).ok())
        .filter(|url| url.origin() == origin.origin())
        .unwrap_or_else(|| origin.clone());

    Notification {
        title: non_empty(parsed.title).unwrap_or_else(|| app_name.to_string()),
        body: non_empty(parsed.body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: non_empty(parsed.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        target,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://kita.example/").unwrap()
    }

    #[test]
    fn test_full_payload() {
        let raw = br#"{"title":"Sommerfest","body":"Samstag ab 14 Uhr","icon":"/images/sun.png","url":"/events"}"#;
        let n = notification_for(Some(raw), &origin(), "Kita");

        assert_eq!(n.title, "Sommerfest");
        assert_eq!(n.body, "Samstag ab 14 Uhr");
        assert_eq!(n.icon, "/images/sun.png");
        assert_eq!(n.target.as_str(), "https://kita.example/events");
    }

    #[test]
    fn test_malformed_or_empty_payload_uses_defaults() {
        for payload in [None, Some(&b""[..]), Some(&b"not json"[..]), Some(&b"{}"[..])] {
            let n = notification_for(payload, &origin(), "Kita");
            assert_eq!(n.title, "Kita");
            assert_eq!(n.body, DEFAULT_BODY);
            assert_eq!(n.target, origin());
        }
    }

    #[test]
    fn test_foreign_url_opens_root() {
        let raw = br#"{"title":"x","url":"https://evil.example/phish"}"#;
        let n = notification_for(Some(raw), &origin(), "Kita");
        assert_eq!(n.target, origin());
    }
}
