//! `nexus chat`: interactive or single-message chat mode.

use nexus_agent::{AgentResult, TraceKind};
use nexus_config::AppConfig;
use nexus_core::history::HistoryTurn;
use nexus_core::message::{Message, Role};
use nexus_core::profile::PlayerProfile;
use nexus_gateway::GatewayState;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

const SESSION: &str = "cli";

pub struct ChatOptions {
    pub message: Option<String>,
    pub user: String,
    pub profile: Option<PathBuf>,
    pub show_trace: bool,
}

pub async fn run(options: ChatOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...   (recommended)");
        eprintln!("    NEXUS_API_KEY=...    (any OpenAI-compatible endpoint)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let profile = match &options.profile {
        Some(path) => Some(load_profile(path)?),
        None => None,
    };

    let model = config.model.clone();
    let state = nexus_gateway::build_state(config).await?;

    if let Some(msg) = options.message {
        eprint!("  Thinking...");
        let result = exchange(&state, &options.user, profile.as_ref(), msg).await;
        eprint!("\r              \r");
        let result = result?;
        println!("{}", result.response);
        if options.show_trace {
            print_trace(&result);
        }
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Nexus Gaming Coach: Interactive         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {model}");
    println!("  Agent:     {}", state.agent.name());
    println!("  User:      {}", options.user);
    println!(
        "  Tools:     {}",
        state
            .agent
            .tools()
            .definitions()
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match exchange(&state, &options.user, profile.as_ref(), line.to_string()).await {
            Ok(result) => {
                eprint!("\r     \r");
                println!();
                for reply_line in result.response.lines() {
                    println!("  Nexus [{}] > {reply_line}", result.mood);
                }
                if options.show_trace {
                    print_trace(&result);
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!("\n  GG! 👋");
    Ok(())
}

/// One chat turn: load context, run the agent, persist the exchange.
///
/// `profile` overrides whatever the profile store holds for `user`.
async fn exchange(
    state: &GatewayState,
    user: &str,
    profile: Option<&PlayerProfile>,
    message: String,
) -> Result<AgentResult, Box<dyn std::error::Error>> {
    let history: Vec<Message> = state
        .history
        .recent(user, SESSION, state.config.gateway.history_limit)
        .await?
        .iter()
        .map(HistoryTurn::to_message)
        .collect();

    let stored = match profile {
        Some(_) => None,
        None => state.profiles.get(user).await?,
    };
    let profile = profile.or(stored.as_ref());
    let username = profile
        .map(|p| p.username.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(user);

    let result = state.agent.run(&message, &history, profile, username).await?;

    state
        .history
        .append(user, SESSION, HistoryTurn::new(Role::User, message))
        .await?;
    state
        .history
        .append(user, SESSION, HistoryTurn::new(Role::Model, result.response.clone()))
        .await?;

    if let Some(insights) = &state.insights {
        insights.clone().spawn(
            user.to_string(),
            SESSION.to_string(),
            state.history.clone(),
            state.profiles.clone(),
            state.config.gateway.history_limit,
        );
    }

    Ok(result)
}

fn load_profile(path: &Path) -> Result<PlayerProfile, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read profile {}: {e}", path.display()))?;
    let profile = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid profile {}: {e}", path.display()))?;
    Ok(profile)
}

fn print_trace(result: &AgentResult) {
    println!();
    println!("  ── reasoning ({} entries) ──", result.trace.len());
    for entry in result.trace.entries() {
        let label = match entry.kind {
            TraceKind::Thought => "thought",
            TraceKind::ToolCall => "tool",
            TraceKind::Observation => "observed",
            TraceKind::Answer => "answer",
        };
        println!("  {label:>9} │ {}", entry.content.replace('\n', " "));
    }
    if !result.tools_used.is_empty() {
        println!("  tools used: {}", result.tools_used.join(", "));
    }
}
