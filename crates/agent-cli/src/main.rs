//! toolbridge terminal agent
//!
//! Connects to the configured tool providers, then answers one query per
//! line until `exit`, `quit`, end of input or Ctrl-C.

mod config;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, AgentError, LlmDecisionEngine, LlmProvider, ProviderDescriptor, Role};
use agent_runtime::{HttpTransport, OllamaProvider, OpenAiProvider};

use crate::config::{CliConfig, ModelBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't interleave with answers
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CliConfig::from_env().context("invalid configuration")?;

    let model = build_model(&config).await?;
    let engine = Arc::new(LlmDecisionEngine::new(model, config.generation_options()));
    let providers = build_providers(&config)?;

    let mut agent = match Agent::bootstrap(engine, providers, config.agent_config()).await {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e).context("could not start the session");
        }
    };

    print_catalog(&agent);

    let token = agent.cancellation_token();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling session");
                token.cancel();
            }
        }
    });

    let outcome = repl(&mut agent, &token, config.show_tool_results).await;

    agent.shutdown().await;
    println!("Goodbye.");
    outcome
}

async fn build_model(config: &CliConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let model: Arc<dyn LlmProvider> = match config.backend {
        ModelBackend::Ollama => Arc::new(OllamaProvider::from_config(config.ollama.clone())),
        ModelBackend::OpenAi => Arc::new(OpenAiProvider::new(config.openai.clone())?),
    };

    // Verify the backend before taking queries
    match model.health_check().await {
        Ok(true) => tracing::info!(backend = ?config.backend, model = %config.model, "Model backend reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(backend = ?config.backend, "Model backend not reachable - turns will fail until it is");
        }
    }

    Ok(model)
}

fn build_providers(config: &CliConfig) -> anyhow::Result<Vec<ProviderDescriptor>> {
    let mut providers = Vec::new();

    if config.builtin_providers {
        providers.extend(workspace_tools::builtin_providers());
    }

    for remote in &config.providers {
        let transport = HttpTransport::new(&remote.url, config.tool_timeout)
            .with_context(|| format!("provider '{}'", remote.id))?;
        providers.push(ProviderDescriptor::new(&remote.id, Arc::new(transport)));
    }

    Ok(providers)
}

fn print_catalog(agent: &Agent) {
    let report = agent.registration();

    println!("Connected tools:");
    for name in agent.registry().names() {
        println!("  • {name}");
    }
    for (provider, reason) in &report.unavailable {
        println!("  ✗ {provider} unavailable: {reason}");
    }
    println!("\nType your query ('reset' clears the conversation, 'exit' quits):");
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit")
}

async fn repl(agent: &mut Agent, token: &CancellationToken, show_tools: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            () = token.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            break;
        }
        if input.eq_ignore_ascii_case("reset") {
            agent.reset_session();
            println!("Conversation cleared.");
            continue;
        }

        match agent.run_turn(input).await {
            Ok(outcome) => {
                if show_tools {
                    print_tool_results(agent);
                }
                if outcome.degraded {
                    println!("\nAgent (partial, stopped after {} tool rounds):\n{}", outcome.rounds, outcome.answer);
                } else {
                    println!("\nAgent: {}", outcome.answer);
                }
            }
            Err(AgentError::Cancelled) => break,
            Err(e) => {
                tracing::error!(error = %e, fatal = e.is_fatal(), "Turn failed");
                println!("\nAgent: {}", e.user_message());
                if ends_session(&e) {
                    return Err(e).context("session ended");
                }
            }
        }
    }

    Ok(())
}

/// Model failures that survived the retry and auth failures end the session
fn ends_session(error: &AgentError) -> bool {
    error.is_fatal() && !matches!(error, AgentError::Cancelled)
}

fn print_tool_results(agent: &Agent) {
    let results: Vec<_> = agent
        .session()
        .conversation
        .current_turn()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();

    if results.is_empty() {
        return;
    }
    println!("\nTool results:");
    for message in results {
        println!("- {}", message.content);
    }
}
