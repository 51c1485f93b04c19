//! Duelist - two-seat card duel engine
//!
//! Plays a match end to end through the orchestrator: the host seat follows
//! an optional command script and then the built-in policy, the away seat is
//! the scheduled AI opponent. Time is simulated, so a full match runs
//! instantly.
//!
//! ## Usage
//!
//! ```
//! duelist [OPTIONS]
//!
//! Options:
//!   --config <path>         OrchestratorConfig JSON (partial documents allowed)
//!   --catalog <path>        JSON array of card definitions (default: starter set)
//!   --deck "id | id | ..."  Host deck (default: starter deck)
//!   --script <path>         JSON array of commands for the host seat
//!   --host <name>           Host identity; changes the match seed
//!   --max-steps <n>         Stop after this many accepted batches (default 2000)
//!   --events                Print every batch as it is accepted
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::collections::VecDeque;
use std::env;
use std::fmt;
use std::fs;
use std::sync::Arc;

use duelist::cards::starter::{starter_cards, starter_deck};
use duelist::cards::{CardSource, JsonFileSource, StaticSource};
use duelist::clock::{Clock, ManualClock};
use duelist::command::{Command, command_from_value};
use duelist::config::OrchestratorConfig;
use duelist::ids::{DefinitionId, MatchId, PlayerIdentity, Seat};
use duelist::net::{
    EventBatch, InMemoryStore, MatchMode, MatchStatus, Orchestrator, OrchestratorError, Submission,
};
use duelist::{GameState, choose_command};
use serde_json::Value;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_STEPS: usize = 2000;

#[derive(Debug)]
enum ConfigError {
    MissingValue(&'static str),
    InvalidValue { flag: &'static str, value: String },
    UnknownFlag(String),
    Read { path: String, message: String },
    Parse { path: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingValue(flag) => write!(f, "{} requires a value", flag),
            ConfigError::InvalidValue { flag, value } => {
                write!(f, "invalid value {:?} for {}", value, flag)
            }
            ConfigError::UnknownFlag(flag) => write!(f, "unknown option {} (try --help)", flag),
            ConfigError::Read { path, message } => write!(f, "cannot read {}: {}", path, message),
            ConfigError::Parse { path, message } => write!(f, "cannot parse {}: {}", path, message),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Match(OrchestratorError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(err) => write!(f, "{}", err),
            CliError::Match(err) => write!(f, "match failed: {}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<OrchestratorError> for CliError {
    fn from(err: OrchestratorError) -> Self {
        CliError::Match(err)
    }
}

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<String>,
    catalog: Option<String>,
    deck: Option<Vec<DefinitionId>>,
    script: Option<String>,
    host: Option<String>,
    max_steps: Option<usize>,
    print_events: bool,
    help: bool,
}

/// Split a `"a | b | c"` card list.
fn parse_card_arg(arg: &str) -> Vec<DefinitionId> {
    arg.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(DefinitionId::new)
        .collect()
}

fn parse_args(args: &[String]) -> Result<CliArgs, ConfigError> {
    let mut parsed = CliArgs::default();
    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = move |name: &'static str| {
            args.get(i + 1)
                .cloned()
                .ok_or(ConfigError::MissingValue(name))
        };
        match flag {
            "--config" => parsed.config = Some(value("--config")?),
            "--catalog" => parsed.catalog = Some(value("--catalog")?),
            "--deck" => parsed.deck = Some(parse_card_arg(&value("--deck")?)),
            "--script" => parsed.script = Some(value("--script")?),
            "--host" => parsed.host = Some(value("--host")?),
            "--max-steps" => {
                let raw = value("--max-steps")?;
                let steps = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    flag: "--max-steps",
                    value: raw.clone(),
                })?;
                parsed.max_steps = Some(steps);
            }
            "--events" => {
                parsed.print_events = true;
                i += 1;
                continue;
            }
            "--help" | "-h" => {
                parsed.help = true;
                i += 1;
                continue;
            }
            other => return Err(ConfigError::UnknownFlag(other.to_string())),
        }
        i += 2;
    }
    Ok(parsed)
}

fn read_json(path: &str) -> Result<Value, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn load_config(path: Option<&str>) -> Result<OrchestratorConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(OrchestratorConfig::default());
    };
    serde_json::from_value(read_json(path)?).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn load_script(path: Option<&str>) -> Result<VecDeque<Command>, ConfigError> {
    let Some(path) = path else {
        return Ok(VecDeque::new());
    };
    let Value::Array(entries) = read_json(path)? else {
        return Err(ConfigError::Parse {
            path: path.to_string(),
            message: "expected an array of commands".to_string(),
        });
    };
    entries
        .into_iter()
        .map(|entry| {
            command_from_value(entry).map_err(|e| ConfigError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn print_usage() {
    println!("Usage: duelist [--config <path>] [--catalog <path>] [--deck \"id | id | ...\"]");
    println!("               [--script <path>] [--host <name>] [--max-steps <n>] [--events]");
}

fn print_batch(batch: &EventBatch) {
    let actor = batch.seat.map_or("-".to_string(), |s| s.to_string());
    let command = batch.command.as_ref().map_or("OPENING", |c| c.type_name());
    println!("v{:<4} {:<5} {}", batch.version, actor, command);
    for event in &batch.events {
        match serde_json::to_string(event) {
            Ok(json) => println!("        {}", json),
            Err(err) => println!("        <unprintable event: {}>", err),
        }
    }
}

fn print_result(match_id: &MatchId, state: &GameState) {
    println!();
    println!("Match {} after turn {}", match_id, state.turn_number);
    for seat in Seat::ALL {
        let player = state.player(seat);
        println!(
            "  {:<5} life {:>5}  hand {}  deck {}  breakdowns {}",
            seat.to_string(),
            player.life,
            player.hand.len(),
            player.deck.len(),
            player.breakdowns_caused
        );
    }
    match (state.winner, state.win_reason) {
        (Some(winner), Some(reason)) => println!("Winner: {} ({:?})", winner, reason),
        _ => println!("No winner yet"),
    }
}

fn submit(
    orchestrator: &Orchestrator,
    match_id: &MatchId,
    host: &PlayerIdentity,
    command: &Command,
) -> Result<Submission, CliError> {
    let raw = serde_json::to_string(command)
        .map_err(|e| CliError::Match(OrchestratorError::Encoding(e.to_string())))?;
    Ok(orchestrator.submit_action(match_id, host, Seat::Host, &raw, None)?)
}

fn run(args: CliArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let mut script = load_script(args.script.as_deref())?;
    let cards: Box<dyn CardSource> = match args.catalog.as_deref() {
        Some(path) => Box::new(JsonFileSource::new(path)),
        None => Box::new(StaticSource::new(starter_cards())),
    };
    let clock = Arc::new(ManualClock::new(0));
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(InMemoryStore::new()),
        cards,
        clock.clone(),
    );

    let host = PlayerIdentity::new(args.host.unwrap_or_else(|| "host".to_string()));
    let deck = args.deck.unwrap_or_else(starter_deck);
    let match_id = orchestrator.create_match(host.clone(), deck, MatchMode::Story, true)?;
    let meta = orchestrator.meta(&match_id)?;
    info!(
        match_id = %match_id,
        seed = meta.seed.unwrap_or_default(),
        first_player = ?meta.first_player,
        "simulating match"
    );

    let max_steps = args.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
    let mut seen = 0;
    loop {
        for batch in orchestrator.get_recent_events(&match_id, None, seen)? {
            if args.print_events {
                print_batch(&batch);
            }
            seen = batch.version;
        }
        if seen as usize >= max_steps {
            warn!(steps = seen, "step limit reached");
            break;
        }
        if orchestrator.meta(&match_id)?.status != MatchStatus::Active {
            break;
        }

        orchestrator.heartbeat(&match_id, &host, Seat::Host)?;
        let view = orchestrator.get_player_view(&match_id, &host, Seat::Host)?;
        if view.decision_seat() == Some(Seat::Host) {
            let command = script
                .pop_front()
                .or_else(|| choose_command(&view, Seat::Host))
                .unwrap_or(Command::EndTurn);
            if let Submission::Rejected { reason, .. } = submit(&orchestrator, &match_id, &host, &command)? {
                warn!(command = command.type_name(), %reason, "host command refused");
                let fallback = choose_command(&view, Seat::Host).unwrap_or(Command::EndTurn);
                let retry = submit(&orchestrator, &match_id, &host, &fallback)?;
                if !retry.is_accepted() {
                    warn!(command = fallback.type_name(), "fallback refused, stopping");
                    break;
                }
            }
            continue;
        }

        let Some(due) = orchestrator.next_job_due()? else {
            warn!("no pending work while the opponent holds the decision");
            break;
        };
        clock.set(due.max(clock.now_ms()));
        let ran = orchestrator.run_due_jobs();
        debug!(ran, now = clock.now_ms(), "jobs ran");
    }

    let state = orchestrator.rebuild_state(&match_id)?;
    print_result(&match_id, &state);
    Ok(())
}

fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging unavailable: {err}");
    }

    let argv: Vec<String> = env::args().collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("Error: {err}");
            print_usage();
            std::process::exit(2);
        }
    };
    if args.help {
        print_usage();
        return;
    }

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
