use clap::Parser;
use potion_solver::simulator::{play_game, GameSummary, POTIONS_TO_FINISH};
use potion_solver::solver::SearchConfig;
use std::error::Error;
use std::io;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of seeded games to play
    #[clap(short, long, default_value_t = 20)]
    games: u64,

    /// Seed of the first game; the rest follow consecutively
    #[clap(short, long, default_value_t = 0)]
    start_seed: u64,

    /// Time budget per turn, in milliseconds
    #[clap(short, long, default_value_t = 35)]
    time_budget_ms: u64,

    /// Maximum number of states expanded per turn
    #[clap(short, long, default_value_t = 10_000_000)]
    max_expansions: u64,

    /// Log2 of the search queue capacity
    #[clap(
        long,
        default_value_t = 24,
        value_parser = clap::value_parser!(u32).range(0..=40)
    )]
    queue_capacity_log2: u32,

    /// Decay base of the heuristic
    #[clap(long)]
    decay: Option<f64>,

    /// Bonus per known spell in the heuristic
    #[clap(long)]
    spell_bonus: Option<f64>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = SearchConfig {
        time_budget: Duration::from_millis(args.time_budget_ms),
        max_expansions: args.max_expansions,
        queue_capacity: 1usize << args.queue_capacity_log2,
        ..SearchConfig::default()
    };
    if let Some(decay) = args.decay {
        config.weights.decay = decay;
    }
    if let Some(bonus) = args.spell_bonus {
        config.weights.spell_bonus = bonus;
    }

    println!("Playing {} games starting at seed {}...", args.games, args.start_seed);

    let mut summaries: Vec<GameSummary> = Vec::new();
    for seed in args.start_seed..args.start_seed + args.games {
        let summary = play_game(seed, &config)?;
        println!(
            "  Seed: {:<6} Score: {:<5} Brewed: {:<3} Turns: {}",
            summary.seed, summary.score, summary.brewed, summary.turns
        );
        summaries.push(summary);
    }

    if summaries.is_empty() {
        println!("No games played.");
        return Ok(());
    }

    let count = summaries.len() as f64;
    let avg_score = summaries.iter().map(|s| f64::from(s.score)).sum::<f64>() / count;
    let avg_turns = summaries.iter().map(|s| f64::from(s.turns)).sum::<f64>() / count;
    let finished = summaries.iter().filter(|s| s.brewed >= POTIONS_TO_FINISH).count();

    println!("\n--- Self-play Complete ---");
    println!("Average score: {:.2}", avg_score);
    println!("Average turns: {:.2}", avg_turns);
    println!("Games with all potions brewed: {}/{}", finished, summaries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_capacity_log2_is_bounded() {
        let args = Args::try_parse_from(["self_play"]).unwrap();
        assert_eq!(args.queue_capacity_log2, 24);
        assert!(Args::try_parse_from(["self_play", "--queue-capacity-log2", "40"]).is_ok());
        assert!(Args::try_parse_from(["self_play", "--queue-capacity-log2", "64"]).is_err());
    }
}
