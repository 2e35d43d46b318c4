//! Directive tokens embedded in model replies.
//!
//! The model asks for side effects by writing bracketed tokens such as
//! `[GIF: wave]` or `[OWNER_IMAGE]` into its free-text answer. This module
//! finds them, turns them into [`Directive`]s ordered by priority, and
//! returns the reply with every known token removed.
//!
//! - `postprocess`: persona clean-up of the raw reply before token scanning

pub mod postprocess;

use once_cell::sync::Lazy;
use regex::Regex;

/// Any known directive token, with optional `: args`. Unknown brackets are left alone.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\[\s*(GLOBAL_MEMORY_RESET|DEEP_RESEARCH|TRIGGER_NOTIFY_OWNER_OFFLINE|GIF|FORWARD|TRIGGER_SEND_REAL_OWNER_PHOTO|OWNER_IMAGE|WEB_SEARCH|VID_SEARCH|REACTION|NEW_LEAD|IMG_SEARCH|SONG_SEARCH|VIDEO_DOWNLOAD|FALLBACK)\s*(?::([^\]]*))?\]",
    )
    .expect("directive token regex")
});

/// Most images a single `[IMG_SEARCH]` may send.
pub const MAX_IMAGE_COUNT: usize = 5;

/// A side effect requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    MemoryReset,
    DeepResearch(String),
    NotifyOwnerOffline,
    Gif(String),
    Forward { phone: String, message: String },
    OwnerPhoto,
    WebSearch(String),
    VideoSearch(String),
    Reaction(String),
    NewLead { name: String, project: String },
    ImageSearch { query: String, count: usize },
    SongSearch(String),
    VideoDownload(String),
    Fallback,
}

impl Directive {
    /// Execution order; lower runs first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::MemoryReset => 0,
            Self::DeepResearch(_) => 1,
            Self::NotifyOwnerOffline => 2,
            Self::Gif(_) => 3,
            Self::Forward { .. } => 4,
            Self::OwnerPhoto => 5,
            Self::WebSearch(_) => 6,
            Self::VideoSearch(_) => 7,
            Self::Reaction(_) => 8,
            Self::NewLead { .. } => 9,
            Self::ImageSearch { .. } => 10,
            Self::SongSearch(_) => 11,
            Self::VideoDownload(_) => 12,
            Self::Fallback => 13,
        }
    }

    /// Terminal directives end reply handling once executed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeepResearch(_)
                | Self::NotifyOwnerOffline
                | Self::Gif(_)
                | Self::OwnerPhoto
                | Self::Fallback
        )
    }

    fn from_token(name: &str, args: &str) -> Option<Self> {
        let args = args.trim();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        match name.to_ascii_uppercase().as_str() {
            "GLOBAL_MEMORY_RESET" => Some(Self::MemoryReset),
            "DEEP_RESEARCH" => non_empty(args).map(Self::DeepResearch),
            "TRIGGER_NOTIFY_OWNER_OFFLINE" => Some(Self::NotifyOwnerOffline),
            "GIF" => non_empty(args).map(Self::Gif),
            "FORWARD" => {
                let (phone, message) = args.split_once('|')?;
                Some(Self::Forward {
                    phone: phone.trim().to_string(),
                    message: message.trim().to_string(),
                })
            }
            "TRIGGER_SEND_REAL_OWNER_PHOTO" | "OWNER_IMAGE" => Some(Self::OwnerPhoto),
            "WEB_SEARCH" => non_empty(args).map(Self::WebSearch),
            "VID_SEARCH" => non_empty(args).map(Self::VideoSearch),
            "REACTION" => non_empty(args).map(Self::Reaction),
            "NEW_LEAD" => {
                let (name, project) = args.split_once(',')?;
                Some(Self::NewLead {
                    name: name.trim().to_string(),
                    project: project.trim().to_string(),
                })
            }
            "IMG_SEARCH" => {
                let (query, count) = parse_image_args(args);
                non_empty(&query).map(|query| Self::ImageSearch { query, count })
            }
            "SONG_SEARCH" => non_empty(args).map(Self::SongSearch),
            "VIDEO_DOWNLOAD" => non_empty(args).map(Self::VideoDownload),
            "FALLBACK" => Some(Self::Fallback),
            _ => None,
        }
    }
}

/// `query, n` → (query, n clamped to 1..=5). A missing or non-numeric count means 1.
fn parse_image_args(args: &str) -> (String, usize) {
    if let Some((query, tail)) = args.rsplit_once(',') {
        let tail = tail.trim();
        if let Ok(n) = tail.parse::<usize>() {
            return (query.trim().to_string(), n.clamp(1, MAX_IMAGE_COUNT));
        }
        if tail.eq_ignore_ascii_case("count") {
            return (query.trim().to_string(), 1);
        }
    }
    (args.trim().to_string(), 1)
}

/// A model reply split into its visible text and requested directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    /// Reply text with every known token removed.
    pub text: String,
    /// At most one directive of each kind, in priority order.
    pub directives: Vec<Directive>,
}

/// Extract directives and strip every known token from `text`.
pub fn parse_reply(text: &str) -> ParsedReply {
    let mut directives: Vec<Directive> = Vec::new();
    for caps in TOKEN.captures_iter(text) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let args = caps.get(2).map_or("", |m| m.as_str());
        let Some(directive) = Directive::from_token(name, args) else {
            continue;
        };
        let seen = directives
            .iter()
            .any(|d| d.priority() == directive.priority());
        if !seen {
            directives.push(directive);
        }
    }
    directives.sort_by_key(Directive::priority);

    ParsedReply {
        text: strip_tokens(text),
        directives,
    }
}

/// Remove every known token, then tidy the blank space it leaves behind.
pub fn strip_tokens(text: &str) -> String {
    let stripped = TOKEN.replace_all(text, "");
    let lines: Vec<&str> = stripped.lines().map(str::trim_end).collect();
    let mut out = String::with_capacity(stripped.len());
    let mut blank_run = 0;
    for line in lines {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Normalize a forward target to a personal JID: digits only, local `03…` → `923…`.
pub fn forward_jid(phone: &str) -> Option<String> {
    let mut digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with("03") {
        digits = format!("92{}", &digits[1..]);
    }
    Some(format!("{digits}@s.whatsapp.net"))
}

#[cfg(test)]
mod tests;
