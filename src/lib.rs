//! # Potion Solver Library
//!
//! This library provides the decision engine for a turn-based potion-brewing
//! game and a best-first search that picks one action per turn under a strict
//! time limit.
//!
//! It is used by two binaries:
//! - `bot`: reads turns from stdin in the contest's line protocol and answers
//!   each with a single command on stdout.
//! - `self_play`: plays seeded games against the local referee and reports
//!   average scores, for tuning the heuristic weights.
//!
//! ## Modules
//! - `engine`: inventory arithmetic, recipes, spells, actions, and `Step`, the
//!   parent-linked search state with its four action generators.
//! - `queue`: `BoundedPriorityQueue`, a fixed-capacity binary heap.
//! - `heuristics`: `Scorer` and `ScoreWeights`, the priority formula.
//! - `solver`: `search` / `search_with`, the time-bounded best-first driver.
//! - `utils`: parsing and formatting of the text protocol.
//! - `simulator`: a seeded referee (`Game`) and `play_game`.
//!
//! ## Example
//! ```
//! use potion_solver::simulator::Game;
//! use potion_solver::solver::{search, SearchConfig};
//!
//! let game = Game::new_with_seed(42);
//! let config = SearchConfig { queue_capacity: 1 << 16, ..SearchConfig::default() };
//! let solution = search(&game.turn_input(), &config).unwrap();
//! println!("{}", solution.first_action());
//! ```

pub mod engine;
pub mod heuristics;
pub mod queue;
pub mod simulator;
pub mod solver;
pub mod utils;
