use clap::Parser;
use potion_solver::simulator::TOTAL_TURNS;
use potion_solver::solver::{search, SearchConfig};
use potion_solver::utils::{format_command, read_turn};
use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Time budget per turn, in milliseconds
    #[clap(short, long, default_value_t = 35)]
    time_budget_ms: u64,

    /// Maximum number of states expanded per turn
    #[clap(short, long, default_value_t = 10_000_000)]
    max_expansions: u64,

    /// Log2 of the search queue capacity
    #[clap(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(0..=40)
    )]
    queue_capacity_log2: u32,

    /// Number of turns in a game
    #[clap(long, default_value_t = TOTAL_TURNS)]
    total_turns: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = SearchConfig {
        time_budget: Duration::from_millis(args.time_budget_ms),
        max_expansions: args.max_expansions,
        queue_capacity: 1usize << args.queue_capacity_log2,
        ..SearchConfig::default()
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut turn = 0u32;

    while let Some(mut turn_input) = read_turn(&mut input)? {
        turn_input.turns_elapsed = turn;
        turn_input.turns_remaining = args.total_turns.saturating_sub(turn);

        let solution = search(&turn_input, &config)?;
        let action = solution.first_action();
        let plan = format!("{} steps, {} expanded", solution.actions.len(), solution.stats.expanded);
        info!(turn, %action, stop = ?solution.stop, expanded = solution.stats.expanded, "chose action");

        writeln!(stdout, "{}", format_command(action, Some(&plan)))?;
        stdout.flush()?;
        turn += 1;
    }
    Ok(())
}
