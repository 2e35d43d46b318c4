//! Keyword commands: instant replies that never reach the model.

mod handlers;


pub use handlers::{download_failed, download_notice, shutdown_notice};

use sable_core::config::PersonaConfig;
use sable_media::MediaFormat;
use sable_memory::{LeadStore, Profile, StatsTracker};
use sable_sandbox::FileSandbox;
use std::time::Instant;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub sender_id: &'a str,
    pub persona: &'a PersonaConfig,
    pub profile: &'a Profile,
    pub stats: &'a StatsTracker,
    pub leads: &'a LeadStore,
    pub sandbox: &'a FileSandbox,
    pub uptime: &'a Instant,
}

/// `fs` sub-commands. File names are validated by the handler, not the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsCommand {
    Help,
    List,
    Create { name: String, content: String },
    Append { name: String, content: String },
    Read(String),
    Delete(String),
}

/// Known keyword commands, in dispatch priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Menu,
    Persona,
    Leads,
    Health,
    Time,
    Joke,
    Quote,
    About,
    Stats,
    Gallery,
    Status,
    Fs(FsCommand),
    Song(String),
    Video(String),
    Shutdown,
}

/// Case-insensitive ASCII prefix strip that keeps the remainder's casing.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn split_piped(rest: &str) -> (String, String) {
    match rest.split_once('|') {
        Some((name, content)) => (name.trim().to_string(), content.trim().to_string()),
        None => (rest.trim().to_string(), String::new()),
    }
}

impl FsCommand {
    fn parse(args: &str) -> Option<Self> {
        let args = args.trim();
        let (sub, rest) = args.split_once(' ').unwrap_or((args, ""));
        let rest = rest.trim();
        match sub.to_lowercase().as_str() {
            "help" => Some(Self::Help),
            "list" => Some(Self::List),
            "create" => {
                let (name, content) = split_piped(rest);
                Some(Self::Create { name, content })
            }
            "append" => {
                let (name, content) = split_piped(rest);
                Some(Self::Append { name, content })
            }
            "read" => Some(Self::Read(rest.to_string())),
            "delete" => Some(Self::Delete(rest.to_string())),
            _ => None,
        }
    }
}

impl Command {
    /// Match trimmed message text against the command table. First match wins.
    ///
    /// Owner-only commands from anyone else return `None` so the text falls
    /// through to the model like any other message.
    pub fn parse(text: &str, is_owner: bool) -> Option<Self> {
        let text = text.trim();
        let lower = text.to_lowercase();
        match lower.as_str() {
            "menu" | "help" | "/menu" => return Some(Self::Menu),
            "elite ai" => return Some(Self::Persona),
            "leads" | "list leads" if is_owner => return Some(Self::Leads),
            "health" => return Some(Self::Health),
            "time" => return Some(Self::Time),
            "joke" => return Some(Self::Joke),
            "quote" => return Some(Self::Quote),
            "owner" | "premium" | "/premium" | "about" => return Some(Self::About),
            "stats" => return Some(Self::Stats),
            "gallery" => return Some(Self::Gallery),
            "status" => return Some(Self::Status),
            _ => {}
        }

        if let Some(args) = strip_prefix_ci(text, "fs ") {
            if let Some(fs) = FsCommand::parse(args) {
                return Some(Self::Fs(fs));
            }
        }

        if let Some(q) = strip_prefix_ci(text, "song ").or_else(|| strip_prefix_ci(text, "play song ")) {
            return Some(Self::Song(q.trim().to_string()));
        }
        if let Some(q) = strip_prefix_ci(text, "video ").or_else(|| strip_prefix_ci(text, "play video ")) {
            return Some(Self::Video(q.trim().to_string()));
        }

        (lower == "nuke" && is_owner).then_some(Self::Shutdown)
    }
}

/// Handle a text command and return the reply.
///
/// `Song`, `Video` and `Shutdown` need the channel and are run by the gateway;
/// here they only produce their first notice.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> String {
    match cmd {
        Command::Menu => handlers::menu(ctx.persona),
        Command::Persona => handlers::persona_check(ctx.persona),
        Command::Leads => handlers::leads(ctx.leads).await,
        Command::Health => handlers::health(ctx.uptime),
        Command::Time => handlers::time(),
        Command::Joke => handlers::joke(),
        Command::Quote => handlers::quote(),
        Command::About => handlers::about(ctx.persona),
        Command::Stats => handlers::stats(ctx.stats, ctx.sender_id, ctx.profile, ctx.persona).await,
        Command::Gallery => handlers::gallery(ctx.stats, ctx.sender_id).await,
        Command::Status => handlers::status(ctx.stats).await,
        Command::Fs(fs) => handlers::fs(ctx.sandbox, ctx.sender_id, fs).await,
        Command::Song(q) => download_notice(MediaFormat::Audio, &q),
        Command::Video(q) => download_notice(MediaFormat::Video, &q),
        Command::Shutdown => shutdown_notice(),
    }
}
