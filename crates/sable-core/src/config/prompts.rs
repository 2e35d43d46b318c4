use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Externalized prompts, loaded from `{data_dir}/prompts/SYSTEM_PROMPT.md` at startup.
///
/// If the file or a section is missing, hardcoded defaults are used.
#[derive(Debug, Clone)]
pub struct Prompts {
    /// Persona system prompt. Placeholders: `{name}`, `{owner}`, `{user}`.
    pub system: String,
    /// Deep-research synthesis prompt. Placeholders: `{name}`, `{query}`, `{findings}`.
    pub research: String,
}

impl Default for Prompts {
    fn default() -> Self {
        let sections = parse_markdown_sections(BUNDLED_SYSTEM_PROMPT);
        Self {
            system: sections.get("System").cloned().unwrap_or_else(|| {
                "You are {name}, chatting on WhatsApp on behalf of {owner}. \
                 The user is {user}. Be friendly and brief."
                    .to_string()
            }),
            research: sections.get("Research").cloned().unwrap_or_else(|| {
                "Answer \"{query}\" briefly using these findings:\n{findings}".to_string()
            }),
        }
    }
}

/// Bundled system prompt, embedded at compile time.
const BUNDLED_SYSTEM_PROMPT: &str = include_str!("../../../../prompts/SYSTEM_PROMPT.md");

/// Deploy bundled prompt files to `{data_dir}/prompts/`, creating the directory if needed.
///
/// Never overwrites existing files so user edits are preserved.
pub fn install_bundled_prompts(data_dir: &Path) {
    let dir = data_dir.join("prompts");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!("prompts: failed to create {}: {e}", dir.display());
        return;
    }

    let dest = dir.join("SYSTEM_PROMPT.md");
    if !dest.exists() {
        if let Err(e) = std::fs::write(&dest, BUNDLED_SYSTEM_PROMPT) {
            warn!("prompts: failed to write {}: {e}", dest.display());
        } else {
            info!("prompts: deployed bundled SYSTEM_PROMPT.md");
        }
    }
}

impl Prompts {
    /// Load prompts from `{data_dir}/prompts/SYSTEM_PROMPT.md`.
    ///
    /// Missing files or sections fall back to defaults.
    pub fn load(data_dir: &Path) -> Self {
        let mut prompts = Self::default();
        let prompt_path = data_dir.join("prompts").join("SYSTEM_PROMPT.md");
        if let Ok(content) = std::fs::read_to_string(&prompt_path) {
            let sections = parse_markdown_sections(&content);
            if let Some(v) = sections.get("System") {
                prompts.system = v.clone();
            }
            if let Some(v) = sections.get("Research") {
                prompts.research = v.clone();
            }
            info!("loaded prompts from {}", prompt_path.display());
        }
        prompts
    }

    /// Persona prompt for one conversation.
    pub fn system_for(&self, name: &str, owner: &str, user: &str) -> String {
        self.system
            .replace("{name}", name)
            .replace("{owner}", owner)
            .replace("{user}", user)
    }

    /// Research synthesis prompt.
    pub fn research_for(&self, name: &str, query: &str, findings: &str) -> String {
        self.research
            .replace("{name}", name)
            .replace("{query}", query)
            .replace("{findings}", findings)
    }
}

/// Parse a markdown file with `## Section` headers into a map of section name -> body.
fn parse_markdown_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_key: Option<String> = None;
    let mut current_body = String::new();

    for line in content.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(key) = current_key.take() {
                let trimmed = current_body.trim().to_string();
                if !trimmed.is_empty() {
                    sections.insert(key, trimmed);
                }
            }
            current_key = Some(header.trim().to_string());
            current_body.clear();
        } else if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }

    if let Some(key) = current_key {
        let trimmed = current_body.trim().to_string();
        if !trimmed.is_empty() {
            sections.insert(key, trimmed);
        }
    }

    sections
}

#[cfg(test)]
pub(super) fn sections_for_test(content: &str) -> HashMap<String, String> {
    parse_markdown_sections(content)
}
