use crate::config::{self, Config};
use crate::event::PlannerEvent;
use crate::logging;
use crate::planner::TravelPlanner;
use crate::server::{self, AppState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

const PROMPT: &str = "Ask me anything: ";
const ANSWER_WIDTH: usize = 100;

#[derive(Parser)]
#[command(name = "roamer")]
#[command(author, version, about = "Multi-source travel planning assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ROAMER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use this station instead of `default_station`
    #[arg(short, long, global = true)]
    pub station: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive question loop (default)
    Chat,

    /// Serve the HTTP API
    Serve {
        /// Bind address (defaults to `server.host`)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to `server.port`)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer a single question and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

/// Entry point for the `roamer` binary.
pub async fn run() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = logging::init(&config, "roamer=info,warn")?;

    let planner = TravelPlanner::from_config(&config)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat_loop(&planner, stdin, std::io::stdout()).await
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("Invalid bind address: {host}:{port}"))?;
            server::serve(addr, AppState::new(planner)).await
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            let mut out = std::io::stdout();
            answer_one(&planner, &question, &mut out).await?;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = config::load_or_create_at(path)?;
            config.apply_env_overrides();
            config
        }
        None => config::load_or_create_config()?,
    };

    if let Some(station) = &cli.station {
        if config.station(station).is_none() {
            anyhow::bail!("Station '{station}' not found in config");
        }
        config.default_station = station.clone();
    }
    Ok(config)
}

fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

/// Read questions line by line until "exit" or end of input.
///
/// A failed turn prints its error and the loop carries on.
pub async fn chat_loop<R, W>(planner: &TravelPlanner, mut input: R, mut out: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Roamer travel planner. Type 'exit' to quit.")?;

    let mut line = String::new();
    loop {
        write!(out, "\n{PROMPT}")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            writeln!(out)?;
            break;
        }
        if is_exit(&line) {
            writeln!(out, "Bye!")?;
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        if let Err(err) = answer_one(planner, question, &mut out).await {
            tracing::error!(error = %err, "turn failed");
            writeln!(out, "Error: {err}")?;
        }
    }
    Ok(())
}

/// Run one question, printing progress as it arrives and then the answer.
async fn answer_one<W: Write>(planner: &TravelPlanner, question: &str, out: &mut W) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let drain = async {
        while let Some(event) = rx.recv().await {
            render_event(&mut *out, &event)?;
        }
        std::io::Result::Ok(())
    };
    let (state, rendered) = tokio::join!(planner.run(question, Some(tx)), drain);
    rendered?;

    let state = state?;
    writeln!(out, "\nFinal Answer:\n")?;
    match state.final_answer.as_deref() {
        Some(answer) => writeln!(out, "{}", wrap_answer(answer, ANSWER_WIDTH))?,
        None => writeln!(out, "(no answer)")?,
    }
    Ok(())
}

fn render_event<W: Write>(out: &mut W, event: &PlannerEvent) -> std::io::Result<()> {
    match event {
        PlannerEvent::Progress { message, .. } => {
            writeln!(out, "{message}")?;
            out.flush()
        }
        PlannerEvent::NodeDegraded { node, error } => {
            writeln!(out, "Warning: {node} failed, continuing without it ({error})")?;
            out.flush()
        }
        PlannerEvent::NodeStarted { .. } | PlannerEvent::NodeFinished { .. } => Ok(()),
    }
}

/// Wrap each paragraph of `text` to `width` columns, keeping blank lines
/// and markdown-style indentation.
pub fn wrap_answer(text: &str, width: usize) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                return String::new();
            }
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            let options = textwrap::Options::new(width)
                .initial_indent(&indent)
                .subsequent_indent(&indent);
            textwrap::fill(line.trim_start(), options)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
