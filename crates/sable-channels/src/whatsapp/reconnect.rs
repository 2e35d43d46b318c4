//! What to do after the connection drops.

use std::time::Duration;

/// Reconnect delay after an ordinary disconnect.
pub const DISCONNECT_DELAY: Duration = Duration::from_secs(5);
/// Reconnect delay after another session replaced ours.
pub const CONFLICT_DELAY: Duration = Duration::from_secs(20);
/// Retry delay after the bot failed to build.
pub const BUILD_RETRY_DELAY: Duration = Duration::from_secs(10);
/// Session conflicts tolerated before giving up.
pub const MAX_CONFLICTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The phone unlinked this device.
    LoggedOut,
    /// Another client opened the same session.
    Conflict,
    /// Building or starting the bot failed.
    BuildFailed,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    Reconnect(Duration),
    /// Stay disconnected until the operator pairs again.
    Stop,
    /// Shut the whole process down.
    Abort,
}

#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    conflicts: u32,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conflicts(&self) -> u32 {
        self.conflicts
    }

    /// A successful connection clears the conflict streak.
    pub fn on_connected(&mut self) {
        self.conflicts = 0;
    }

    pub fn decide(&mut self, reason: DisconnectReason) -> ReconnectDecision {
        match reason {
            DisconnectReason::LoggedOut => ReconnectDecision::Stop,
            DisconnectReason::Conflict => {
                self.conflicts += 1;
                if self.conflicts >= MAX_CONFLICTS {
                    ReconnectDecision::Abort
                } else {
                    ReconnectDecision::Reconnect(CONFLICT_DELAY)
                }
            }
            DisconnectReason::BuildFailed => ReconnectDecision::Reconnect(BUILD_RETRY_DELAY),
            DisconnectReason::Other => ReconnectDecision::Reconnect(DISCONNECT_DELAY),
        }
    }
}
