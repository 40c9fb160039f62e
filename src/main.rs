use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reachout::bridge::{Bridge, TabChannel};
use reachout::coordinator::{Coordinator, InstallReason};
use reachout::extractor::ProfileExtractor;
use reachout::host::InProcessHost;
use reachout::popup::Popup;
use reachout::providers::{GeminiClient, MessageGenerator, MockGenerator};
use reachout::storage::{JsonFileSettingsStore, SettingsStore};
use reachout::types::settings::KEY_SETTINGS;
use reachout::{Config, MessageLength, PageSnapshot, Preferences, Tone, UserContext};

#[derive(Parser)]
#[command(name = "reachout")]
#[command(about = "Draft outreach notes from profile pages", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the profile extracted from a saved page
    Extract {
        #[arg(long, help = "Address the page was saved from")]
        url: String,
        #[arg(long, help = "Saved HTML of the page")]
        html: PathBuf,
    },
    /// Generate a message for a saved page
    Generate {
        #[arg(long)]
        url: String,
        #[arg(long)]
        html: PathBuf,
        #[arg(long, help = "Use the offline generator instead of Gemini")]
        mock: bool,
    },
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Initialize settings, or migrate them after an update
    Install {
        #[arg(long, value_name = "FROM", help = "Version being updated from")]
        update: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        length: Option<MessageLength>,
        #[arg(long)]
        tone: Option<Tone>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::from_env();

    match cli.command {
        Commands::Extract { url, html } => extract(&config, url, &html).await?,
        Commands::Generate { url, html, mock } => generate(&config, url, &html, mock).await?,
        Commands::Settings { command } => settings(&config, command).await?,
        Commands::Install { update } => install(&config, update).await?,
    }

    Ok(())
}

fn open_store(config: &Config) -> Arc<JsonFileSettingsStore> {
    Arc::new(JsonFileSettingsStore::new(&config.settings_path))
}

async fn read_page(url: String, html: &Path) -> Result<PageSnapshot> {
    let markup = tokio::fs::read_to_string(html)
        .await
        .with_context(|| format!("reading {}", html.display()))?;
    Ok(PageSnapshot::new(url, markup))
}

async fn extract(config: &Config, url: String, html: &Path) -> Result<()> {
    let extractor = ProfileExtractor::new(&config.extractor_config()?)?;
    let page = read_page(url, html).await?;
    let profile = extractor.extract_page(&page)?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

fn build_generator(config: &Config, mock: bool) -> Result<Arc<dyn MessageGenerator>> {
    if mock {
        return Ok(Arc::new(MockGenerator::new()));
    }
    let Some(api_key) = config.gemini_api_key.clone() else {
        bail!("GEMINI_API_KEY is not set; pass --mock to generate offline");
    };
    let mut client = GeminiClient::new(api_key)
        .with_model(config.gemini_model.clone())
        .with_timeout(config.request_timeout());
    if let Some(base) = &config.gemini_api_base {
        client = client.with_base_url(base.clone());
    }
    Ok(Arc::new(client))
}

async fn generate(config: &Config, url: String, html: &Path, mock: bool) -> Result<()> {
    let generator = build_generator(config, mock)?;
    let store = open_store(config);
    let extractor = Arc::new(ProfileExtractor::new(&config.extractor_config()?)?);
    let page = read_page(url, html).await?;

    let host = Arc::new(InProcessHost::new(extractor, store.clone()));
    let tab = host.open_tab(page.url, page.html);
    let channel: Arc<dyn TabChannel> = host;
    let bridge = Arc::new(Bridge::new(channel, config.bridge_config()));

    let coordinator = Coordinator::new(store, generator).with_relay(bridge.clone());
    let (handle, _task) = coordinator.spawn(16);
    let popup = Popup::new(handle.with_timeout(config.request_timeout()), bridge, tab);

    match popup.generate().await {
        Ok(message) => {
            println!("{}", message.text);
            Ok(())
        }
        Err(e) => bail!("{} {}", e, e.user_hint()),
    }
}

async fn settings(config: &Config, command: SettingsCommand) -> Result<()> {
    let store = open_store(config);
    match command {
        SettingsCommand::Show => {
            let document = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        SettingsCommand::Set {
            context,
            role,
            length,
            tone,
        } => {
            let document = store.load().await?;
            let current = UserContext::from_document(&document);
            let updated = UserContext::new(
                context.unwrap_or(current.user_context),
                role.unwrap_or(current.user_role),
            );
            let mut patch = updated.to_patch();

            if length.is_some() || tone.is_some() {
                let mut preferences = Preferences::from_document(&document);
                if let Some(length) = length {
                    preferences.message_length = length;
                }
                if let Some(tone) = tone {
                    preferences.tone = tone;
                }
                patch.insert(KEY_SETTINGS.to_string(), serde_json::to_value(&preferences)?);
            }

            store.merge(patch).await?;
            println!("Saved settings to {}", store.path().display());
        }
    }
    Ok(())
}

async fn install(config: &Config, update: Option<String>) -> Result<()> {
    let store = open_store(config);
    let coordinator = Coordinator::new(store.clone(), Arc::new(MockGenerator::new()));
    let reason = match update {
        Some(previous_version) => InstallReason::Update { previous_version },
        None => InstallReason::Install,
    };
    println!("Running {} for {}", reason.as_str(), store.path().display());
    coordinator.on_installed(reason).await?;
    Ok(())
}
