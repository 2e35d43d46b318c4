//! Reply texts for keyword commands.

use super::FsCommand;
use rand::seq::SliceRandom;
use sable_core::config::{jid_user, PersonaConfig};
use sable_core::message::PresenceStatus;
use sable_media::MediaFormat;
use sable_memory::{LeadStore, Profile, StatsTracker};
use sable_sandbox::{format_file_size, sanitize_file_name, FileSandbox};
use std::time::Instant;
use tracing::warn;

const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs. 😂",
    "Hardware: The parts of a computer that can be kicked. 💻",
    "A SQL query walks into a bar, walks up to two tables, and asks, 'Can I join you?'",
    "Algorithm: Words used by programmers when they don't want to explain what they did.",
];

const QUOTES: &[&str] = &[
    "\"First, solve the problem. Then, write the code.\" – John Johnson",
    "\"Experience is the name everyone gives to their mistakes.\" – Oscar Wilde",
    "\"Knowledge is power.\" – Francis Bacon",
    "\"Code is like humor. When you have to explain it, it's bad.\" – Cory House",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const INVALID_NAME: &str = "❌ Invalid file name.";

pub(super) fn menu(persona: &PersonaConfig) -> String {
    [
        format!("💎 *{} Elite*", persona.name),
        "────────────────────".to_string(),
        format!("🤖 *{} AI (remembers our chat)*", persona.name),
        "   • Just type your question".to_string(),
        "   • *elite ai* – personality check".to_string(),
        String::new(),
        "📂 *File Sandbox*".to_string(),
        "   • *fs help* – manage your files".to_string(),
        "   • *fs list* – see your sandbox".to_string(),
        String::new(),
        "🎵 *Entertainment*".to_string(),
        "   • *song <name>* / *video <name>*".to_string(),
        "   • ask for any picture and I'll find it".to_string(),
        String::new(),
        "📊 *System & Stats*".to_string(),
        "   • *status* – see online users".to_string(),
        "   • *stats* – your chat history".to_string(),
        "   • *gallery* – see media stats".to_string(),
        "   • *health* – system performance".to_string(),
        String::new(),
        "💡 *Fun & Info*".to_string(),
        "   • *joke* / *quote* / *time*".to_string(),
        format!("   • */premium* – about {}", persona.owner_name),
        String::new(),
        format!("👑 *Owner*: {}", persona.owner_name),
        "────────────────────".to_string(),
        "Type *menu* to see this list again.".to_string(),
    ]
    .join("\n")
}

pub(super) fn persona_check(persona: &PersonaConfig) -> String {
    format!(
        "💎 *{} Elite*\n\nMain {} hoon yaar. AI waghaira ka koi scene nahi hai. \
         Engineering aur business focus hai bas. 🚀",
        persona.name, persona.name
    )
}

pub(super) fn about(persona: &PersonaConfig) -> String {
    format!(
        "👋 Hello! I'm {owner}, Full Stack Developer.\n\n\
         🌐 *Full Stack Expertise*\n\
         I build fast, scalable, modern web applications end to end.\n\n\
         🚀 *What I Can Build For You*\n\
         - Modern responsive websites\n\
         - High-performance web applications\n\
         - REST APIs & backend systems\n\
         - Full end-to-end solutions\n\n\
         📬 *Let's Connect*\n\
         Tell {name} about your idea and we'll turn it into a real project. ✨",
        owner = persona.owner_name,
        name = persona.name,
    )
}

pub(super) async fn leads(store: &LeadStore) -> String {
    let all = match store.all().await {
        Ok(all) => all,
        Err(e) => {
            warn!("failed to read leads: {e}");
            return "❌ Could not read the leads file.".to_string();
        }
    };
    if all.is_empty() {
        return "📂 *Leads Directory*\n\nAbhi tak koi leads nahi hain yaar. Kaam pe lag jao! 🚀"
            .to_string();
    }
    let list = all
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{}. *{}*: {} ({})", i + 1, l.name, l.project, jid_user(&l.jid)))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "📂 *Collected Leads*\n\n{list}\n\nTotal: {} leads found. 🔥",
        all.len()
    )
}

/// Resident set size of this process in MB, from `/proc/self/statm`.
fn rss_mb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some((pages * 4) as f64 / 1024.0)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

pub(super) fn health(uptime: &Instant) -> String {
    let memory = rss_mb()
        .map(|mb| format!("{mb:.2} MB"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "🚀 *System Health*\n\n⏱️ Uptime: {}s\n📦 Memory: {memory}\n✅ Status: Operational",
        uptime.elapsed().as_secs()
    )
}

pub(super) fn time() -> String {
    format!(
        "⏰ *Current Server Time*\n\n{}",
        chrono::Local::now().format(TIME_FORMAT)
    )
}

fn pick(list: &[&str]) -> String {
    list.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

pub(super) fn joke() -> String {
    format!("😂 *Dev Joke*\n\n{}", pick(JOKES))
}

pub(super) fn quote() -> String {
    format!("💡 *Tech Quote*\n\n{}", pick(QUOTES))
}

pub(super) async fn stats(
    tracker: &StatsTracker,
    sender: &str,
    profile: &Profile,
    persona: &PersonaConfig,
) -> String {
    let Some(s) = tracker.user_stats(sender).await else {
        return "📈 No stats yet, say hi first!".to_string();
    };
    format!(
        "📈 *Your Stats*\n\n• Messages Sent: *{}*\n• First Seen: *{}*\n• Profile: *{}*\n\nPowered by *{}*",
        s.messages,
        s.first_seen.with_timezone(&chrono::Local).format(TIME_FORMAT),
        profile.relationship,
        persona.name,
    )
}

pub(super) async fn gallery(tracker: &StatsTracker, sender: &str) -> String {
    let m = tracker.media_stats(sender).await;
    let last = m
        .last_updated
        .map(|t| t.with_timezone(&chrono::Local).format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "No media yet".to_string());
    format!(
        "🖼️ *Your Gallery Stats*\n\n• Images Sent: *{}*\n• Videos Sent: *{}*\n• Last Activity: *{last}*",
        m.images, m.videos
    )
}

fn presence_line(jid: &str, status: PresenceStatus) -> String {
    let icon = match status {
        PresenceStatus::Available => "🟢",
        PresenceStatus::Composing => "✍️",
        PresenceStatus::Offline => "⚪",
    };
    format!("• {}: {icon} {}", jid_user(jid), status.label())
}

pub(super) async fn status(tracker: &StatsTracker) -> String {
    let presences = tracker.presences().await;
    if presences.is_empty() {
        return "No presence data yet.".to_string();
    }
    let list = presences
        .iter()
        .map(|(jid, status)| presence_line(jid, *status))
        .collect::<Vec<_>>()
        .join("\n");
    format!("👥 *Live Status*\n\n{list}")
}

pub(super) async fn fs(sandbox: &FileSandbox, sender: &str, cmd: FsCommand) -> String {
    match cmd {
        FsCommand::Help => "📂 *File System Help*\n\n\
             • `fs list` - List files\n\
             • `fs create <name> | <content>` - Create file\n\
             • `fs append <name> | <content>` - Add to file\n\
             • `fs read <name>` - Read file\n\
             • `fs delete <name>` - Delete file"
            .to_string(),
        FsCommand::List => match sandbox.list(sender).await {
            Ok(files) if files.is_empty() => "📂 *Your Files:*\nNo files yet.".to_string(),
            Ok(files) => {
                let list = files
                    .iter()
                    .map(|f| format!("{} ({})", f.name, format_file_size(f.size)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("📂 *Your Files:*\n{list}")
            }
            Err(e) => {
                warn!("sandbox list failed for {sender}: {e}");
                "❌ Could not list your files.".to_string()
            }
        },
        FsCommand::Create { name, content } => {
            if sanitize_file_name(&name).is_none() {
                return INVALID_NAME.to_string();
            }
            match sandbox.create(sender, &name, &content).await {
                Ok(file) => format!(
                    "✅ File *{}* created. ({})",
                    file.name,
                    format_file_size(file.size)
                ),
                Err(e) => {
                    warn!("sandbox create failed for {sender}: {e}");
                    "❌ Could not create the file.".to_string()
                }
            }
        }
        FsCommand::Append { name, content } => {
            if sanitize_file_name(&name).is_none() {
                return INVALID_NAME.to_string();
            }
            match sandbox.append(sender, &name, &content).await {
                Ok(file) => format!(
                    "✅ Content added to *{}*. New size: {}",
                    file.name,
                    format_file_size(file.size)
                ),
                Err(_) => "❌ File not found. Use `fs create` first.".to_string(),
            }
        }
        FsCommand::Read(name) => {
            let Some(safe) = sanitize_file_name(&name) else {
                return INVALID_NAME.to_string();
            };
            match sandbox.read(sender, &safe).await {
                Ok(data) => format!("📄 *{safe}*:\n\n{data}"),
                Err(_) => "❌ File not found.".to_string(),
            }
        }
        FsCommand::Delete(name) => {
            if sanitize_file_name(&name).is_none() {
                return INVALID_NAME.to_string();
            }
            match sandbox.delete(sender, &name).await {
                Ok(safe) => format!("🗑️ File *{safe}* deleted."),
                Err(e) => {
                    warn!("sandbox delete failed for {sender}: {e}");
                    "❌ Could not delete the file.".to_string()
                }
            }
        }
    }
}

/// First reply to a `song` / `video` request.
pub fn download_notice(format: MediaFormat, query: &str) -> String {
    match format {
        MediaFormat::Audio => {
            format!("🎵 *Searching Audio:* {query}...\n_(Please wait, downloading MP3)_")
        }
        MediaFormat::Video => {
            format!("🎬 *Searching Video:* {query}...\n_(Please wait, downloading MP4)_")
        }
    }
}

/// Reply when every download provider failed.
pub fn download_failed(format: MediaFormat) -> String {
    match format {
        MediaFormat::Audio => {
            "❌ Could not download the song right now. Try another query or use video search."
                .to_string()
        }
        MediaFormat::Video => {
            "❌ Could not download the video right now. Try searching via web.".to_string()
        }
    }
}

pub fn shutdown_notice() -> String {
    "🧨 Shutting down this process... Goodbye! (Restart with `sable start`)".to_string()
}
