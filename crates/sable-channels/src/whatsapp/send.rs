//! Message sending utilities: formatting, chunking, and retry.

use sable_core::error::SableError;
use std::time::Duration;
use tracing::{error, warn};
use wacore_binary::jid::Jid;
use whatsapp_rust::client::Client;

/// WhatsApp's per-message text limit.
pub const MAX_MESSAGE_LEN: usize = 4096;
pub(super) const SEND_ATTEMPTS: usize = 3;
pub(super) const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Send a WhatsApp message, retrying up to three times with a fixed 2 s pause.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: waproto::whatsapp::Message,
) -> Result<String, SableError> {
    let mut last_err = None;

    for attempt in 1..=SEND_ATTEMPTS {
        match client.send_message(jid.clone(), msg.clone()).await {
            Ok(msg_id) => return Ok(msg_id),
            Err(e) => {
                if attempt < SEND_ATTEMPTS {
                    warn!(
                        "whatsapp send attempt {attempt}/{SEND_ATTEMPTS} to {jid} failed: {e}, retrying in {}s",
                        RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                } else {
                    error!("whatsapp send attempt {attempt}/{SEND_ATTEMPTS} to {jid} failed: {e}, giving up");
                }
                last_err = Some(e);
            }
        }
    }

    Err(SableError::Channel(format!(
        "whatsapp send failed after {SEND_ATTEMPTS} attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Convert Markdown formatting to WhatsApp-native formatting.
///
/// - `## Header` -> `*HEADER*` (bold uppercase)
/// - `**bold**` -> `*bold*`
/// - `[text](url)` -> `text (url)`
/// - `| col | col |` table rows -> `- col | col` bullets
/// - `---` horizontal rules -> removed
pub fn sanitize_for_whatsapp(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.chars().all(|c| c == '-' || c == ' ') && trimmed.matches('-').count() >= 3 {
            continue;
        }

        if let Some(header) = ["### ", "## ", "# "]
            .iter()
            .find_map(|p| trimmed.strip_prefix(*p))
        {
            out.push_str(&format!("*{}*\n", header.trim().to_uppercase()));
            continue;
        }

        if trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|') {
            let inner = &trimmed[1..trimmed.len() - 1];
            if inner
                .chars()
                .all(|c| c == '-' || c == '|' || c == ' ' || c == ':')
            {
                continue;
            }
            let cols: Vec<&str> = inner.split('|').map(str::trim).collect();
            out.push_str("- ");
            out.push_str(&cols.join(" | "));
            out.push('\n');
            continue;
        }

        let mut result = convert_links(line);

        while let Some(start_pos) = result.find("**") {
            let Some(end_pos) = result[start_pos + 2..].find("**") else {
                break;
            };
            let abs_end = start_pos + 2 + end_pos;
            let inner_text = result[start_pos + 2..abs_end].to_string();
            result.replace_range(start_pos..abs_end + 2, &format!("*{inner_text}*"));
        }

        out.push_str(&result);
        out.push('\n');
    }

    if !text.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }

    out
}

/// `[text](url)` -> `text (url)`. Brackets that are not links are left alone.
fn convert_links(line: &str) -> String {
    let mut result = line.to_string();
    let mut search_from = 0;
    while let Some(rel) = result[search_from..].find('[') {
        let start = search_from + rel;
        let Some(close) = result[start..].find("](").map(|i| start + i) else {
            break;
        };
        let Some(end) = result[close + 2..].find(')').map(|i| close + 2 + i) else {
            break;
        };
        let link_text = &result[start + 1..close];
        if link_text.contains('[') {
            search_from = start + 1;
            continue;
        }
        let replacement = format!("{link_text} ({})", &result[close + 2..end]);
        result.replace_range(start..=end, &replacement);
        search_from = start + replacement.len();
    }
    result
}

/// Split a long message into chunks of at most `max_len` bytes, preferring
/// newline breaks and never cutting inside a UTF-8 character.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // max_len smaller than one character: emit that character whole.
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
