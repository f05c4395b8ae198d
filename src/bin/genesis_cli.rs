//! Genesis Command Line Interface
//!
//! Interactive client for driving a simulation session without an MCP host.
//!
//! # Usage
//!
//! ```bash
//! # REPL: each line is a request; /help lists commands
//! genesis_cli --dry-run
//!
//! # Pull the code out of an LLM reply
//! cat reply.md | genesis_cli extract
//!
//! # Show the prompt a fresh session would send
//! genesis_cli prompt "drop a ball onto a plane"
//!
//! # Browse templates
//! genesis_cli templates --category robots
//! ```

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use genesis_mcp::{
    CodeExtractor, EngineHandle, PromptBuilder, ServerConfig, SimulationSession, TurnReport,
    TurnRequest,
};
use genesis_mcp::session::{ConversationHistory, SessionState};
use genesis_templates::TemplateRegistry;

#[derive(Parser)]
#[command(name = "genesis_cli")]
#[command(version)]
#[command(about = "Interactive client for Genesis simulation sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Use the scripted offline engine instead of Python
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print JSON instead of coloured text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Repl,

    /// Extract the code fragment from an LLM reply
    Extract {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the prompt a fresh session would send for a request
    Prompt { description: String },

    /// List templates, optionally for one category
    Templates {
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Engine and LLM availability
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genesis_mcp=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => cmd_repl(cli.dry_run, cli.json).await,
        Commands::Extract { file } => cmd_extract(file, cli.json),
        Commands::Prompt { description } => cmd_prompt(&description),
        Commands::Templates { category } => cmd_templates(category, cli.json),
        Commands::Status => cmd_status(cli.dry_run, cli.json).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(dry_run: bool) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::from_env()?;
    if dry_run {
        config.runtime.dry_run = true;
    }
    Ok(config)
}

async fn cmd_repl(dry_run: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(dry_run)?;
    let templates = Arc::new(TemplateRegistry::builtin()?);
    let llm = match genesis_agentic::create_llm_client() {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("{} {}", "no LLM backend:".yellow(), e);
            None
        }
    };
    let engine = EngineHandle::new(config.runtime.clone());
    let mut session = SimulationSession::open(&engine, &config.session, templates, llm).await?;

    println!("{}", "Genesis session ready. /help for commands.".bold());
    let mut rl = DefaultEditor::new()?;
    loop {
        let line = match rl.readline("genesis> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => print_help(),
            ("/status", _) => println!("{}", session.state().summary()),
            ("/reset", _) => {
                session.reset().await?;
                println!("{}", "session reset".green());
            }
            ("/prompt", rest) => println!("{}", session.prompt_for(rest)),
            ("/code", rest) => {
                let code = rest.replace("\\n", "\n");
                let report = session.run_turn(TurnRequest::with_code("client code", code)).await;
                print_report(&report, json)?;
            }
            _ => {
                let report = session.run_turn(TurnRequest::describe(line)).await;
                print_report(&report, json)?;
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("  <text>         generate and run code for a request");
    println!("  /code <src>    run code directly (\\n for newlines)");
    println!("  /prompt <text> show the prompt for a request");
    println!("  /status        completed stages");
    println!("  /reset         restart the engine");
    println!("  /quit");
}

fn print_report(report: &TurnReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", "--- code ---".dimmed());
    println!("{}", report.code);
    println!("{}", "--- output ---".dimmed());
    for line in &report.logs {
        println!("{}", line);
    }
    let status = match report.disposition {
        "executed" => "EXECUTED".green().bold(),
        "skipped" => "SKIPPED".yellow().bold(),
        "rejected" => "REJECTED".red().bold(),
        _ => "FAILED".red().bold(),
    };
    println!(
        "{} in {:.2}s, next stage: {}",
        status,
        report.execution_time.as_secs_f64(),
        report.next_stage
    );
    for note in &report.notes {
        println!("  {} {}", "note:".cyan(), note);
    }
    Ok(())
}

fn cmd_extract(file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let extraction = CodeExtractor.extract_detailed(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
    } else {
        if !extraction.found() {
            eprintln!("{}", "no code block found; returning input".yellow());
        }
        println!("{}", extraction.code);
    }
    Ok(())
}

fn cmd_prompt(description: &str) -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    let templates = Arc::new(TemplateRegistry::builtin()?);
    let builder = PromptBuilder::new(
        templates,
        config.session.template_top_k,
        config.session.template_excerpt_chars,
    )
    .with_alias(&config.runtime.alias);
    println!(
        "{}",
        builder.build(
            description,
            &SessionState::new(),
            &ConversationHistory::new(config.session.history_turns)
        )
    );
    Ok(())
}

fn cmd_templates(category: Option<String>, json: bool) -> anyhow::Result<()> {
    let registry = TemplateRegistry::builtin()?;
    let index = registry.index();

    if json {
        let value = match &category {
            Some(c) => serde_json::json!({"category": c, "templates": index.get(c)}),
            None => serde_json::to_value(&index)?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (name, templates) in &index {
        if category.as_ref().is_some_and(|c| c != name) {
            continue;
        }
        println!("{}", name.bold());
        for template in templates {
            let description = registry
                .get(name, template)
                .map(|t| t.description.as_str())
                .unwrap_or_default();
            println!("  {:<20} {}", template.green(), description.dimmed());
        }
    }
    Ok(())
}

async fn cmd_status(dry_run: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(dry_run)?;
    let probe = EngineHandle::new(config.runtime.clone()).probe().await;
    let backend = genesis_agentic::current_backend()
        .map(|b| b.name().to_string())
        .map_err(|e| e.to_string());

    if json {
        let value = serde_json::json!({
            "engine": probe,
            "runtime": config.runtime,
            "session": config.session,
            "llm_backend": backend.as_ref().ok(),
            "llm_error": backend.as_ref().err(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mark = |ok: bool| if ok { "OK".green() } else { "MISSING".red() };
    println!("engine   {} {}", mark(probe.available), probe.detail);
    match &backend {
        Ok(name) => println!("llm      {} {}", mark(true), name),
        Err(e) => println!("llm      {} {}", mark(false), e),
    }
    println!("gate     {}", config.session.gate_policy);
    Ok(())
}
