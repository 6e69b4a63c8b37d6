mod config_loader;

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config_loader::ConfigLoader;
use mc_bot_core::agent::fragments::PromptTemplates;
use mc_bot_core::agent::{
    ActionResponse, Actor, ActorConfig, EnvironmentSnapshot, ProviderSelection,
};

const DEFAULT_CONFIG_FILE: &str = "bot.toml";

/// On-disk layout: `[actor]` (with `[actor.provider]` and `[actor.challenge]`) and an optional
/// `[templates]` table overriding individual prompt fragments.
#[derive(Debug, Default, Deserialize)]
struct RunnerConfig {
    #[serde(default)]
    actor: ActorConfig,
    #[serde(default)]
    templates: PromptTemplates,
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Applies `MC_BOT_MODEL`, `MC_BOT_PROVIDER` and `MC_BOT_DELAY_MS`. Blank values are ignored.
fn apply_env_overrides(
    cfg: &mut ActorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(model) = non_empty(&lookup, "MC_BOT_MODEL") {
        cfg.model = model;
    }

    if let Some(name) = non_empty(&lookup, "MC_BOT_PROVIDER") {
        let selected = ProviderSelection::from_name(&name).ok_or_else(|| {
            anyhow::anyhow!("unknown provider {name:?} (expected openrouter or ollama)")
        })?;
        // Keep file-level credentials when the kind is unchanged.
        if selected.name() != cfg.provider.name() {
            cfg.provider = selected;
        }
    }

    if let Some(delay) = non_empty(&lookup, "MC_BOT_DELAY_MS") {
        cfg.delay_after_action_ms = delay
            .parse()
            .with_context(|| format!("MC_BOT_DELAY_MS is not a number: {delay:?}"))?;
    }
    Ok(())
}

fn load_config() -> anyhow::Result<RunnerConfig> {
    match std::env::var("MC_BOT_CONFIG").ok().filter(|s| !s.trim().is_empty()) {
        Some(path) => ConfigLoader::parse_from_file(&path),
        None if ConfigLoader::find(DEFAULT_CONFIG_FILE).is_some() => {
            ConfigLoader::parse_from_file(DEFAULT_CONFIG_FILE)
        }
        None => {
            warn!(file = DEFAULT_CONFIG_FILE, "no config file found, using defaults");
            Ok(RunnerConfig::default())
        }
    }
}

/// Collects tasks that already finished, logging failures. Returns how many failed.
fn reap_finished(tasks: &mut JoinSet<()>) -> usize {
    let mut failed = 0;
    while let Some(res) = tasks.try_join_next() {
        if let Err(err) = res {
            warn!(%err, "event task failed");
            failed += 1;
        }
    }
    failed
}

async fn write_responses(mut rx: mpsc::UnboundedReceiver<ActionResponse>) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    while let Some(resp) = rx.recv().await {
        let mut line = serde_json::to_string(&resp).context("encode action response")?;
        line.push('\n');
        out.write_all(line.as_bytes()).await.context("stdout write")?;
        out.flush().await.ok();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let RunnerConfig {
        actor: mut cfg,
        templates,
    } = load_config()?;
    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;

    let actor = Arc::new(
        Actor::new(cfg)
            .context("actor setup")?
            .with_templates(templates),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_responses(rx));

    // One task per event so overlapping events reach the actor concurrently.
    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("stdin read")? {
        reap_finished(&mut tasks);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let snapshot: EnvironmentSnapshot = match serde_json::from_str(line) {
            Ok(s) => s,
            Err(err) => {
                warn!(%err, "skipping malformed snapshot line");
                continue;
            }
        };

        let actor = actor.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            let resp = actor.on_event(&snapshot).await;
            tx.send(resp).ok();
        });
    }

    while let Some(res) = tasks.join_next().await {
        if let Err(err) = res {
            warn!(%err, "event task failed");
        }
    }
    drop(tx);
    writer.await.context("stdout writer task")??;

    info!(
        history = actor.history().len(),
        chat = actor.game_chat().len(),
        "stdin closed, shutting down"
    );
    Ok(())
}
