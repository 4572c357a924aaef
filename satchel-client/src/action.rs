//! Effects the coordinator asks the page to perform

use satchel_core::{SyncKind, WorkerMessage};

use crate::connectivity::Banner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    ShowUpdateBanner { version: String },
    HideUpdateBanner,
    /// Post a message to the waiting worker
    PostMessage(WorkerMessage),
    /// Reload the page so the new worker serves it
    Reload,
    ShowInstallPrompt,
    ShowBanner(Banner),
    HideBanner,
    /// Ask the sync manager to fire the tags of these kinds
    RegisterSync(Vec<SyncKind>),
}
