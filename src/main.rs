mod ai;
mod api;
mod commands;
mod gateway;
mod logging;
mod markers;

use ai::AiService;
use clap::{Parser, Subcommand};
use sable_channels::whatsapp::WhatsAppChannel;
use sable_core::{
    config::{self, Prompts},
    context::Context,
    traits::{Channel, Provider},
};
use sable_media::MediaClient;
use sable_memory::ConversationStore;
use sable_providers::{OpenAiProvider, WhisperTranscriber};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sable", version, about = "Sable — a WhatsApp persona bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and start answering messages.
    Start,
    /// Print the configuration summary and check the model endpoint.
    Status,
    /// Send a one-shot message to the persona.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env();
    let data_dir = cfg.sable.data_path();
    config::ensure_layout(&data_dir)?;

    let _log_guard = logging::init(&data_dir.join("logs"), &cfg.sable.log_level)?;

    config::install_bundled_prompts(&data_dir);
    let prompts = Prompts::load(&data_dir);
    let provider = Arc::new(OpenAiProvider::from_config(&cfg.provider));
    let has_api_key = !cfg.provider.api_key.trim().is_empty();

    match cli.command {
        Commands::Start => {
            if !has_api_key {
                tracing::warn!("GROQ_API_KEY is not set; every chat reply will be a notice");
            }

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
            if cfg.channel.whatsapp.enabled {
                let channel = WhatsAppChannel::new(cfg.channel.whatsapp.clone(), &data_dir);
                channels.insert("whatsapp".to_string(), Arc::new(channel));
            }
            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable WhatsApp in config.toml.");
            }

            let media = MediaClient::from_config(&cfg.media)?;
            let transcriber = Arc::new(WhisperTranscriber::from_config(&cfg.provider));
            let conversations =
                ConversationStore::new(data_dir.join("history"), cfg.memory.max_history);
            let ai = AiService::new(
                provider,
                transcriber,
                conversations,
                prompts,
                cfg.persona.clone(),
                has_api_key,
            );

            println!("{} — starting...", cfg.persona.name);
            let gw = gateway::Gateway::new(&cfg, data_dir, ai, channels, media);
            Arc::new(gw).run().await?;
        }
        Commands::Status => {
            println!("{} — Status Check\n", cfg.persona.name);
            println!("Config: {}", cli.config);
            println!("Data dir: {}", data_dir.display());
            println!("Owner: {} ({})", cfg.persona.owner_name, cfg.persona.owner_jid);
            println!("Model: {} @ {}", cfg.provider.model, cfg.provider.base_url);
            println!();

            let available = has_api_key && provider.is_available().await;
            println!(
                "  provider: {}",
                if !has_api_key {
                    "missing api key"
                } else if available {
                    "available"
                } else {
                    "unreachable"
                }
            );
            println!(
                "  whatsapp: {}",
                if cfg.channel.whatsapp.enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!(
                "  qr server: {}",
                if cfg.api.enabled {
                    format!("http://{}:{}", cfg.api.host, cfg.api.port)
                } else {
                    "disabled".to_string()
                }
            );
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: sable ask <message>");
            }
            if !has_api_key {
                anyhow::bail!("GROQ_API_KEY is not set.");
            }

            let prompt = message.join(" ");
            let mut context = Context::new(&prompt);
            context.system_prompt =
                prompts.system_for(&cfg.persona.name, &cfg.persona.owner_name, "CLI");
            let response = provider.complete(&context).await?;
            println!("{}", response.text);
        }
    }

    Ok(())
}
