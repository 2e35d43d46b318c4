//! # sable-memory
//!
//! Everything Sable remembers, as flat JSON/text files keyed by sender JID:
//! conversation transcripts, profiles, the shared leads registry, and the
//! message audit log. Per-sender counters and presences live in memory only.

pub mod audit;
pub mod conversation;
pub mod leads;
pub mod profiles;
pub mod stats;

pub use conversation::ConversationStore;
pub use leads::{Lead, LeadStore};
pub use profiles::{Profile, ProfileStore};
pub use stats::{MediaKind, MediaStats, StatsTracker, UserStats};

/// File-name-safe key for a JID: `:`, `@` and `.` become `_`.
pub fn file_key(jid: &str) -> String {
    jid.chars()
        .map(|c| match c {
            ':' | '@' | '.' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key() {
        assert_eq!(
            file_key("923001234567:5@s.whatsapp.net"),
            "923001234567_5_s_whatsapp_net"
        );
        assert_eq!(file_key("../etc"), "___etc");
    }
}
