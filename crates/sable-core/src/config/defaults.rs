//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Sable".to_string()
}

pub fn default_data_dir() -> String {
    "~/.sable".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_owner_name() -> String {
    "the owner".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

pub fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

pub fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

pub fn default_transcription_model() -> String {
    "whisper-large-v3".to_string()
}

pub fn default_temperature() -> f32 {
    0.7
}

pub fn default_max_tokens() -> u32 {
    1024
}

pub fn default_max_history() -> usize {
    12
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

pub fn default_request_timeout() -> u64 {
    30
}
