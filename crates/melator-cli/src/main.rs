// Melator command-line entry point.
//
// Startup sequence:
// 1. Initialize tracing (log file by default, stderr on request)
// 2. Load config, copying defaults into config/ on first run
// 3. Load the draw history in the background and wait for it
// 4. Run the requested subcommand against the shared session

mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use melator_core::config::{self, Config};
use melator_core::explorer::{self, DrawFilter};
use melator_core::generator::{
    DecadeSpread, GapProfile, GenerateError, GenerationOutcome, GenerationRequest, HighLowPattern,
    ParityPattern, SumRange,
};
use melator_core::session::{Session, SessionLoader};

#[derive(Parser)]
#[command(
    name = "melator",
    version,
    about = "Draw statistics and constrained combination generator for Melate"
)]
struct Cli {
    /// Directory holding config/, defaults/ and the data files
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Draw history CSV, overriding `data.draws_csv` from the config
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log to stderr instead of logs/melator.log
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show frequency, co-occurrence and distribution statistics
    Stats {
        /// How many rows of each ranked table to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Only show the pairs and trios that contain this number
        #[arg(short, long)]
        number: Option<u8>,
    },

    /// Generate a combination that satisfies every given filter
    Generate {
        /// Ticket size (6 to 10 numbers)
        #[arg(short, long, default_value = "6")]
        size: usize,

        /// Numbers that must appear
        #[arg(short, long, value_delimiter = ',')]
        include: Vec<u8>,

        /// Numbers that must not appear
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<u8>,

        /// Decade buckets to leave out (0 = 1-9, ..., 5 = 50-56)
        #[arg(long, value_delimiter = ',')]
        exclude_decade: Vec<usize>,

        /// Minimum sum (needs --sum-max)
        #[arg(long, requires = "sum_max")]
        sum_min: Option<u32>,

        /// Maximum sum (needs --sum-min)
        #[arg(long, requires = "sum_min")]
        sum_max: Option<u32>,

        /// Exact even/odd split, e.g. 3P-3I
        #[arg(long)]
        parity: Option<ParityPattern>,

        /// Exact low/high split, e.g. 3B-3A
        #[arg(long)]
        high_low: Option<HighLowPattern>,

        /// Decade spread: any, balanced or concentrated
        #[arg(long, default_value = "any")]
        decades: DecadeSpread,

        /// Gap profile: any, ideal, clustered or spread
        #[arg(long, default_value = "any")]
        gaps: GapProfile,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Score a combination against the historical distributions
    Analyze {
        /// Six numbers, or up to ten for a multi-number ticket
        #[arg(required = true, value_delimiter = ',', num_args = 1..)]
        numbers: Vec<u8>,
    },

    /// Check a play against a draw, or against the whole history
    Check {
        /// Draw id to check against; omit to scan every draw
        #[arg(short, long)]
        draw: Option<String>,

        /// The six numbers played
        #[arg(required = true, value_delimiter = ',', num_args = 1..)]
        numbers: Vec<u8>,
    },

    /// List draws, newest first, with optional filters
    History {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(short, long, default_value = "1")]
        page: usize,

        #[arg(long, default_value_t = explorer::DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },

    /// Show one draw in full, with its shape and how its numbers stand today
    Explore {
        /// Draw id
        id: String,
    },

    /// Rank every number by cold streak and composite score
    Temperature,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Substring of the draw id
    #[arg(long)]
    id: Option<String>,

    /// Number present in any of the three games
    #[arg(short, long)]
    number: Option<u8>,

    /// Draw date, YYYY-MM-DD, DD/MM/YYYY or DD-MM-YYYY
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

impl From<FilterArgs> for DrawFilter {
    fn from(args: FilterArgs) -> Self {
        DrawFilter {
            draw_id: args.id,
            number: args.number,
            date: args.date,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    melator_core::ingest::parse_date(s).ok_or_else(|| format!("unrecognized date `{s}`"))
}

const PULSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.root, cli.log_stderr)?;
    info!("melator starting up");

    let mut config = config::load_config(&cli.root).context("failed to load configuration")?;
    if let Some(csv) = &cli.csv {
        config.data.draws_csv = csv.display().to_string();
    }
    info!(csv = %config.data.draws_csv, "config loaded");

    let session = load_session(&cli.root, config).await?;
    let json = cli.json;

    match cli.command {
        Command::Stats { top, number } => cmd_stats(&session, top, number, json),
        Command::Generate {
            size,
            include,
            exclude,
            exclude_decade,
            sum_min,
            sum_max,
            parity,
            high_low,
            decades,
            gaps,
            seed,
        } => {
            let mut request = GenerationRequest::new(size);
            request.included = include;
            request.excluded = exclude;
            request.excluded_decades = exclude_decade;
            request.criteria.sum_range = match (sum_min, sum_max) {
                (Some(min), Some(max)) => Some(SumRange { min, max }),
                _ => None,
            };
            request.criteria.parity = parity;
            request.criteria.high_low = high_low;
            request.criteria.decade_spread = decades;
            request.criteria.gap_profile = gaps;
            cmd_generate(&session, request, seed, json).await
        }
        Command::Analyze { numbers } => cmd_analyze(&session, &numbers, json),
        Command::Check { draw, numbers } => cmd_check(&session, draw.as_deref(), &numbers, json),
        Command::History {
            filter,
            page,
            page_size,
        } => cmd_history(&session, filter.into(), page, page_size, json),
        Command::Explore { id } => cmd_explore(&session, &id, json),
        Command::Temperature => cmd_temperature(&session, json),
    }
}

async fn load_session(root: &Path, config: Config) -> Result<Arc<Session>> {
    let mut loader = SessionLoader::spawn(root, config);
    let session = loader
        .wait_ready()
        .await
        .context("failed to load draw history")?;
    info!(
        draws = session.stats().history.len(),
        complete = session.stats().complete_draws,
        "history loaded"
    );
    Ok(session)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_stats(session: &Session, top: usize, number: Option<u8>, json: bool) -> Result<()> {
    let stats = session.stats();
    let Some(n) = number else {
        if json {
            return print_json(stats);
        }
        display::display_stats(stats, top);
        return Ok(());
    };
    if !melator_core::draw::is_valid_number(n) {
        bail!("{n} is not a Melate number (1-56)");
    }
    let pairs = stats.pairs.containing(n, top);
    let trios = stats.trios.containing(n, top);
    if json {
        return print_json(&serde_json::json!({
            "number": n,
            "frequency": stats.frequency.get(n),
            "pairs": pairs,
            "trios": trios,
        }));
    }
    display::display_number_groups(n, stats.frequency.get(n), &pairs, &trios);
    Ok(())
}

async fn cmd_generate(
    session: &Arc<Session>,
    request: GenerationRequest,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let handle = session.spawn_generate(request, seed);
    let canceller = handle.canceller();
    let join = handle.join();
    tokio::pin!(join);

    let mut interrupted = false;
    let result: Result<GenerationOutcome, GenerateError> = loop {
        tokio::select! {
            result = &mut join => break result,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                warn!("interrupt received; cancelling generation");
                canceller.cancel();
                interrupted = true;
            }
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(GenerateError::Cancelled) => {
            eprintln!("Generation cancelled.");
            return Ok(());
        }
        Err(e) => bail!(e),
    };

    let hits = session.generation_hits(&outcome)?;
    if json {
        print_json(&serde_json::json!({
            "outcome": outcome,
            "historical_hits": hits,
        }))?;
    } else {
        display::display_generation(&outcome);
        if let Some(hits) = &hits {
            println!();
            display::display_historical_hits(&outcome.numbers, hits);
        }
    }
    session.flush_pulses(PULSE_FLUSH_TIMEOUT).await;
    Ok(())
}

fn cmd_analyze(session: &Session, numbers: &[u8], json: bool) -> Result<()> {
    if numbers.len() == melator_core::draw::NUMBERS_PER_DRAW {
        let result = session.analyze(numbers)?;
        if json {
            return print_json(&result);
        }
        display::display_analysis(&result);
    } else {
        let tally = session.analyze_ticket(numbers)?;
        if json {
            return print_json(&tally);
        }
        display::display_tally(numbers, &tally);
    }
    Ok(())
}

fn cmd_check(session: &Session, draw_id: Option<&str>, play: &[u8], json: bool) -> Result<()> {
    match draw_id {
        Some(draw_id) => {
            let result = session.check_play(play, draw_id)?;
            if json {
                return print_json(&result);
            }
            display::display_check(&result);
        }
        None => {
            let hits = session.historical_hits(play)?;
            if json {
                return print_json(&hits);
            }
            display::display_historical_hits(play, &hits);
        }
    }
    Ok(())
}

fn cmd_history(
    session: &Session,
    filter: DrawFilter,
    page: usize,
    page_size: usize,
    json: bool,
) -> Result<()> {
    let matches = session.explore(&filter);
    let page = explorer::paginate(&matches, page, page_size);
    if json {
        return print_json(&page);
    }
    display::display_history(&page);
    Ok(())
}

fn cmd_explore(session: &Session, id: &str, json: bool) -> Result<()> {
    let Some(draw) = session.find_draw(id) else {
        bail!("draw {} not found", id.trim());
    };
    let summary = explorer::summarize(draw);
    if json {
        return print_json(&serde_json::json!({ "draw": draw, "summary": summary }));
    }
    display::display_draw(draw, &summary, session.stats());
    Ok(())
}

fn cmd_temperature(session: &Session, json: bool) -> Result<()> {
    let temperatures = session.temperatures();
    if json {
        return print_json(&temperatures);
    }
    display::display_temperatures(&temperatures);
    Ok(())
}

/// Initialize tracing. Output goes to `<root>/logs/melator.log` so it never
/// mixes with command output, unless `to_stderr` is set.
fn init_tracing(root: &Path, to_stderr: bool) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("melator_core=info,melator=info,warn"));

    if to_stderr {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .finish();
        return tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber");
    }

    let log_dir = root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join("melator.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_flags_parse_into_criteria() {
        let cli = Cli::try_parse_from([
            "melator",
            "generate",
            "--include",
            "7,21",
            "--exclude-decade",
            "5",
            "--parity",
            "3P-3I",
            "--decades",
            "balanced",
            "--gaps",
            "ideal",
            "--sum-min",
            "120",
            "--sum-max",
            "220",
        ])
        .unwrap();
        match cli.command {
            Command::Generate {
                include,
                exclude_decade,
                parity,
                decades,
                gaps,
                sum_min,
                sum_max,
                ..
            } => {
                assert_eq!(include, vec![7, 21]);
                assert_eq!(exclude_decade, vec![5]);
                assert_eq!(parity, Some(ParityPattern { even: 3 }));
                assert_eq!(decades, DecadeSpread::Balanced);
                assert_eq!(gaps, GapProfile::Ideal);
                assert_eq!((sum_min, sum_max), (Some(120), Some(220)));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn sum_bounds_come_in_pairs() {
        assert!(Cli::try_parse_from(["melator", "generate", "--sum-min", "100"]).is_err());
    }

    #[test]
    fn bad_parity_is_rejected() {
        assert!(Cli::try_parse_from(["melator", "generate", "--parity", "4P-4I"]).is_err());
    }

    #[test]
    fn stats_can_focus_on_one_number() {
        match Cli::try_parse_from(["melator", "stats", "--number", "17", "--top", "5"])
            .unwrap()
            .command
        {
            Command::Stats { top, number } => {
                assert_eq!(top, 5);
                assert_eq!(number, Some(17));
            }
            _ => panic!("expected stats"),
        }
        match Cli::try_parse_from(["melator", "stats"]).unwrap().command {
            Command::Stats { number, .. } => assert_eq!(number, None),
            _ => panic!("expected stats"),
        }
    }

    #[test]
    fn analyze_accepts_spaces_or_commas() {
        for args in [
            vec!["melator", "analyze", "1,2,3,4,5,6"],
            vec!["melator", "analyze", "1", "2", "3", "4", "5", "6"],
        ] {
            match Cli::try_parse_from(args).unwrap().command {
                Command::Analyze { numbers } => assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]),
                _ => panic!("expected analyze"),
            }
        }
    }

    #[test]
    fn dates_parse_in_every_history_form() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 21);
        assert_eq!(parse_date("2024-05-21").ok(), expected);
        assert_eq!(parse_date("21/05/2024").ok(), expected);
        assert_eq!(parse_date("21-05-2024").ok(), expected);
        assert!(parse_date("May 21").is_err());
    }
}
