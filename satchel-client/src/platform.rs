//! Platform detection
//!
//! Supports: iOS (Safari and in-app browsers), Android, desktop browsers

use std::fmt;

/// Platform family the page runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Ios => "iOS",
            Platform::Android => "Android",
            Platform::Desktop => "Desktop",
        })
    }
}

/// What the browser can do about installing the app
pub trait InstallCapabilities: Send + Sync {
    /// Browser fires its own install prompt event
    fn supports_native_install_prompt(&self) -> bool;

    /// iOS Safari, which can only install through "Add to Home Screen"
    fn is_ios_safari(&self) -> bool;

    /// Page is already running as an installed app
    fn is_standalone(&self) -> bool;

    fn platform(&self) -> Platform;
}

/// Capabilities derived from the user-agent string
#[derive(Debug, Clone)]
pub struct UserAgentCapabilities {
    platform: Platform,
    ios_safari: bool,
    native_prompt: bool,
    standalone: bool,
}

impl UserAgentCapabilities {
    /// `standalone` comes from the display-mode media query, which the UA
    /// string cannot tell
    pub fn detect(user_agent: &str, standalone: bool) -> Self {
        let ua = user_agent.to_ascii_lowercase();

        let platform = if ["iphone", "ipad", "ipod"].iter().any(|d| ua.contains(d)) {
            Platform::Ios
        } else if ua.contains("android") {
            Platform::Android
        } else {
            Platform::Desktop
        };

        // Chrome, Firefox and in-app browsers on iOS all carry "Safari" too
        let ios_safari = platform == Platform::Ios
            && ua.contains("safari")
            && !["crios", "fxios", "edgios", "fban", "fbav", "instagram"]
                .iter()
                .any(|m| ua.contains(m));

        // Chromium engines fire beforeinstallprompt; Firefox and Safari do not
        let chromium = (ua.contains("chrome") || ua.contains("chromium") || ua.contains("edg/"))
            && !ua.contains("firefox");
        let native_prompt = platform != Platform::Ios && chromium;

        Self {
            platform,
            ios_safari,
            native_prompt,
            standalone,
        }
    }

    pub fn ios() -> Self {
        Self::detect(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
            false,
        )
    }

    pub fn android() -> Self {
        Self::detect(
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
            false,
        )
    }

    pub fn desktop() -> Self {
        Self::detect(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            false,
        )
    }
}

impl InstallCapabilities for UserAgentCapabilities {
    fn supports_native_install_prompt(&self) -> bool {
        self.native_prompt
    }

    fn is_ios_safari(&self) -> bool {
        self.ios_safari
    }

    fn is_standalone(&self) -> bool {
        self.standalone
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

/// Manual install steps for browsers without a native prompt
pub fn install_instructions(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Ios => &[
            "Tap the Share button in Safari",
            "Scroll down and choose \"Add to Home Screen\"",
            "Tap \"Add\" in the top right corner",
        ],
        Platform::Android => &[
            "Open the browser menu (three dots)",
            "Choose \"Install app\" or \"Add to Home screen\"",
            "Confirm with \"Install\"",
        ],
        Platform::Desktop => &[
            "Click the install icon in the address bar",
            "Or open the browser menu and choose \"Install Kita\"",
        ],
    }
}
