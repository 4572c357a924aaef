//! Satchel Client
//!
//! Runs in the page. Detects the platform, gates the install prompt,
//! bridges worker updates to the user, and reports connectivity changes.

pub mod action;
pub mod connectivity;
pub mod coordinator;
pub mod platform;
pub mod prompt;
pub mod update;

pub use action::ClientAction;
pub use connectivity::{Banner, ConnectivityMonitor};
pub use coordinator::ClientCoordinator;
pub use platform::{install_instructions, InstallCapabilities, Platform, UserAgentCapabilities};
pub use prompt::InstallPromptGate;
pub use update::{poll_updates, UpdateBridge, UpdateCheck};
