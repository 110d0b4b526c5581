use crate::engine::{Action, Inventory, LearnableSpell, Recipe, Spell, Step, MAX_CAST_TIMES};
use crate::heuristics::{ScoreWeights, Scorer};
use crate::queue::{BoundedPriorityQueue, QueueError};
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info_span, warn};

/// Everything the search needs to know about the current turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    pub inventory: Inventory,
    pub spells: Vec<Spell>,
    /// Tome spells in tome order; the index of an entry is its learning cost.
    pub learnables: Vec<LearnableSpell>,
    pub recipes: Vec<Recipe>,
    /// Turns already played this game.
    pub turns_elapsed: u32,
    /// Turns left in the game, including the current one.
    pub turns_remaining: u32,
}

/// Budgets and tuning for one search call. The defaults match the contest
/// time limit with some margin.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub time_budget: Duration,
    pub max_expansions: u64,
    /// The clock is only read every this many expansions.
    pub time_check_interval: u64,
    /// Queue capacity; must be a power of two.
    pub queue_capacity: usize,
    /// Learning is only considered on paths shorter than this.
    pub max_learn_depth: u32,
    pub weights: ScoreWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_millis(35),
            max_expansions: 10_000_000,
            time_check_interval: 50,
            queue_capacity: 1 << 30,
            max_learn_depth: 3,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("could not build the search queue: {0}")]
    Queue(#[from] QueueError),
}

/// Why a search call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QueueExhausted,
    ExpansionLimit,
    TimeBudget,
    /// The queue hit its capacity; the result is whatever was dequeued last.
    QueueOverflow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: u64,
    pub enqueued: u64,
    pub peak_queue: usize,
}

/// Result of a search call.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The most recently dequeued step.
    pub best: Rc<Step>,
    /// Actions from the root to `best`, in play order.
    pub actions: Vec<Action>,
    pub stop: StopReason,
    pub stats: SearchStats,
}

impl Solution {
    /// The command to play this turn; `Wait` when the search never left the root.
    pub fn first_action(&self) -> Action {
        self.actions.first().copied().unwrap_or(Action::Wait)
    }
}

/// Source of elapsed time for the time budget.
pub trait Clock {
    fn elapsed(&self) -> Duration;
}

/// Measures wall-clock time since it was started.
pub struct WallClock {
    started_at: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        WallClock {
            started_at: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Hooks called by the search loop. All methods default to doing nothing.
pub trait SearchObserver {
    fn on_expand(&mut self, _step: &Step) {}
    fn on_enqueue(&mut self, _step: &Step) {}
    fn on_stop(&mut self, _reason: StopReason, _stats: &SearchStats) {}
}

pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Tallies expansions and enqueued successors by action kind.
#[derive(Debug, Default, Clone)]
pub struct CountingObserver {
    pub expanded: u64,
    pub rests: u64,
    pub brews: u64,
    pub casts: u64,
    pub learns: u64,
    pub stops: Vec<StopReason>,
}

impl SearchObserver for CountingObserver {
    fn on_expand(&mut self, _step: &Step) {
        self.expanded += 1;
    }

    fn on_enqueue(&mut self, step: &Step) {
        match step.action() {
            Some(Action::Rest) => self.rests += 1,
            Some(Action::Brew { .. }) => self.brews += 1,
            Some(Action::Cast { .. }) => self.casts += 1,
            Some(Action::Learn { .. }) => self.learns += 1,
            Some(Action::Wait) | None => {}
        }
    }

    fn on_stop(&mut self, reason: StopReason, _stats: &SearchStats) {
        self.stops.push(reason);
    }
}

fn compare_priority(a: &Rc<Step>, b: &Rc<Step>) -> Ordering {
    a.priority().total_cmp(&b.priority())
}

type StepQueue = BoundedPriorityQueue<Rc<Step>, fn(&Rc<Step>, &Rc<Step>) -> Ordering>;

struct Frontier<'a, O: SearchObserver> {
    queue: StepQueue,
    stats: SearchStats,
    observer: &'a mut O,
}

impl<O: SearchObserver> Frontier<'_, O> {
    fn push(&mut self, step: Rc<Step>) -> Result<(), QueueError> {
        self.queue.enqueue(Rc::clone(&step))?;
        self.observer.on_enqueue(&step);
        self.stats.enqueued += 1;
        self.stats.peak_queue = self.stats.peak_queue.max(self.queue.size());
        Ok(())
    }

    fn push_some(&mut self, step: Option<Rc<Step>>) -> Result<(), QueueError> {
        match step {
            Some(step) => self.push(step),
            None => Ok(()),
        }
    }
}

/// Runs a best-first search for the current turn on the wall clock.
///
/// See [`search_with`].
pub fn search(input: &TurnInput, config: &SearchConfig) -> Result<Solution, SearchError> {
    search_with(input, config, &WallClock::start(), &mut NoopObserver)
}

/// Runs a best-first search from the position described by `input`.
///
/// Steps are dequeued in priority order and every legal successor is
/// enqueued, except rests that would not refresh any spell. The search stops when the queue runs dry, when
/// `config.max_expansions` steps have been expanded, when `clock` reports
/// more than `config.time_budget` (checked every
/// `config.time_check_interval` expansions), or when the queue overflows.
/// The returned step is the last one dequeued.
///
/// # Returns
/// * `Err(SearchError::Queue)` only if `config.queue_capacity` is not a power of two.
pub fn search_with<C, O>(
    input: &TurnInput,
    config: &SearchConfig,
    clock: &C,
    observer: &mut O,
) -> Result<Solution, SearchError>
where
    C: Clock,
    O: SearchObserver,
{
    let span = info_span!("search", turn = input.turns_elapsed);
    let _guard = span.enter();

    let scorer = Scorer::new(config.weights, input.turns_elapsed);
    let compare: fn(&Rc<Step>, &Rc<Step>) -> Ordering = compare_priority;
    let mut frontier = Frontier {
        queue: BoundedPriorityQueue::new(config.queue_capacity, compare)?,
        stats: SearchStats::default(),
        observer,
    };

    let root = Step::root(
        input.inventory,
        input.spells.clone(),
        input.learnables.clone(),
        input.recipes.clone(),
        &scorer,
    );
    let mut best = Rc::clone(&root);
    frontier.push(root)?;

    let interval = config.time_check_interval.max(1);
    let stop = loop {
        let current = match frontier.queue.dequeue() {
            Ok(step) => step,
            Err(_) => break StopReason::QueueExhausted,
        };
        best = Rc::clone(&current);

        if frontier.stats.expanded >= config.max_expansions {
            break StopReason::ExpansionLimit;
        }
        if frontier.stats.expanded % interval == 0 && clock.elapsed() > config.time_budget {
            break StopReason::TimeBudget;
        }

        frontier.observer.on_expand(&current);
        frontier.stats.expanded += 1;
        if let Err(err) = expand(&current, input, config, &scorer, &mut frontier) {
            warn!(%err, expanded = frontier.stats.expanded, "search queue overflowed");
            break StopReason::QueueOverflow;
        }
    };

    let stats = frontier.stats;
    frontier.observer.on_stop(stop, &stats);
    debug!(
        expanded = stats.expanded,
        enqueued = stats.enqueued,
        peak_queue = stats.peak_queue,
        stop = ?stop,
        elapsed_us = clock.elapsed().as_micros() as u64,
        "search finished"
    );

    let actions = best.actions();
    Ok(Solution {
        best,
        actions,
        stop,
        stats,
    })
}

fn expand<O: SearchObserver>(
    step: &Rc<Step>,
    input: &TurnInput,
    config: &SearchConfig,
    scorer: &Scorer,
    frontier: &mut Frontier<'_, O>,
) -> Result<(), QueueError> {
    for index in 0..step.recipes().len() {
        frontier.push_some(Step::brew(step, index, scorer))?;
    }

    if step.path_length() > input.turns_remaining {
        return Ok(());
    }

    // A rest with nothing to refresh would only delay the same position.
    let refreshes = step.spells().iter().any(|spell| spell.exhausted);
    if step.action() != Some(Action::Rest) && refreshes {
        frontier.push(Step::rest(step, scorer))?;
    }
    if step.path_length() < config.max_learn_depth {
        for index in 0..step.learnables().len() {
            frontier.push_some(Step::learn(step, index, scorer))?;
        }
    }
    for (index, spell) in step.spells().iter().enumerate() {
        let max_times = if spell.descriptor.repeatable {
            MAX_CAST_TIMES
        } else {
            1
        };
        for times in 1..=max_times {
            frontier.push_some(Step::cast(step, index, times, scorer))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SpellDescriptor;
    use std::cell::Cell;

    /// A clock that never advances.
    struct FrozenClock;

    impl Clock for FrozenClock {
        fn elapsed(&self) -> Duration {
            Duration::ZERO
        }
    }

    /// A clock that is always past any budget.
    struct ExpiredClock;

    impl Clock for ExpiredClock {
        fn elapsed(&self) -> Duration {
            Duration::from_secs(3600)
        }
    }

    /// A frozen clock that counts how often it is read.
    #[derive(Default)]
    struct CountingClock {
        reads: Cell<u64>,
    }

    impl Clock for CountingClock {
        fn elapsed(&self) -> Duration {
            self.reads.set(self.reads.get() + 1);
            Duration::ZERO
        }
    }

    fn test_config(max_expansions: u64) -> SearchConfig {
        SearchConfig {
            max_expansions,
            queue_capacity: 1 << 16,
            ..SearchConfig::default()
        }
    }

    fn learn_then_brew_input() -> TurnInput {
        TurnInput {
            inventory: Inventory::EMPTY,
            spells: vec![],
            learnables: vec![LearnableSpell {
                descriptor: SpellDescriptor::new(21, Inventory::new([0, 1, 0, 0]), false),
                reward: 0,
            }],
            recipes: vec![Recipe::new(50, Inventory::new([0, -1, 0, 0]), 10)],
            turns_elapsed: 0,
            turns_remaining: 100,
        }
    }

    fn opening_input() -> TurnInput {
        let spell = |id, price, repeatable| {
            Spell::new(SpellDescriptor::new(id, Inventory::new(price), repeatable))
        };
        TurnInput {
            inventory: Inventory::new([3, 0, 0, 0]),
            spells: vec![
                spell(78, [2, 0, 0, 0], false),
                spell(79, [-1, 1, 0, 0], true),
                spell(80, [0, -1, 1, 0], true),
                spell(81, [0, 0, -1, 1], true),
            ],
            learnables: vec![
                LearnableSpell {
                    descriptor: SpellDescriptor::new(2, Inventory::new([1, 1, 0, 0]), false),
                    reward: 0,
                },
                LearnableSpell {
                    descriptor: SpellDescriptor::new(3, Inventory::new([0, 0, 1, 0]), false),
                    reward: 0,
                },
            ],
            recipes: vec![
                Recipe::new(44, Inventory::new([0, -2, 0, 0]), 8),
                Recipe::new(45, Inventory::new([-2, 0, -2, 0]), 8),
                Recipe::new(46, Inventory::new([0, 0, 0, -2]), 16),
            ],
            turns_elapsed: 0,
            turns_remaining: 100,
        }
    }

    #[test]
    fn test_learns_first_with_default_config() {
        for turns_elapsed in [0, 1] {
            let input = TurnInput {
                turns_elapsed,
                turns_remaining: 100 - turns_elapsed,
                ..learn_then_brew_input()
            };
            let solution =
                search_with(&input, &SearchConfig::default(), &FrozenClock, &mut NoopObserver)
                    .unwrap();

            assert_eq!(solution.stop, StopReason::QueueExhausted);
            assert_eq!(solution.first_action(), Action::Learn { id: 21 });
        }
    }

    #[test]
    fn test_learns_then_casts_then_brews() {
        let input = learn_then_brew_input();
        let solution =
            search_with(&input, &test_config(3), &FrozenClock, &mut NoopObserver).unwrap();

        assert_eq!(solution.stop, StopReason::ExpansionLimit);
        assert_eq!(
            solution.actions,
            vec![
                Action::Learn { id: 21 },
                Action::Cast { id: 21, times: 1 },
                Action::Brew { id: 50 }
            ]
        );
        assert_eq!(solution.best.brewed(), &[50]);
    }

    #[test]
    fn test_first_action_is_learn_at_any_budget() {
        let input = learn_then_brew_input();
        for max_expansions in [1, 2, 3, 10, 50, 1_000] {
            let solution =
                search_with(&input, &test_config(max_expansions), &FrozenClock, &mut NoopObserver)
                    .unwrap();
            assert_eq!(solution.first_action(), Action::Learn { id: 21 });
        }
    }

    #[test]
    fn test_empty_position_waits() {
        let input = TurnInput {
            turns_remaining: 10,
            ..TurnInput::default()
        };
        let mut observer = CountingObserver::default();
        let solution =
            search_with(&input, &test_config(1_000), &FrozenClock, &mut observer).unwrap();

        assert_eq!(solution.stop, StopReason::QueueExhausted);
        assert!(solution.best.is_root());
        assert_eq!(solution.first_action(), Action::Wait);
        assert_eq!(observer.rests + observer.brews + observer.casts + observer.learns, 0);
        assert_eq!(solution.stats.enqueued, 1);
        assert_eq!(solution.stats.expanded, 1);
        assert_eq!(observer.stops, vec![StopReason::QueueExhausted]);
    }

    #[test]
    fn test_rests_only_to_refresh_spells() {
        let input = learn_then_brew_input();
        let solution =
            search_with(&input, &test_config(1_000), &FrozenClock, &mut NoopObserver).unwrap();
        let mut exhausted = false;
        for action in &solution.actions {
            match action {
                Action::Rest => {
                    assert!(exhausted, "rest in {:?}", solution.actions);
                    exhausted = false;
                }
                Action::Cast { .. } => exhausted = true,
                _ => {}
            }
        }
    }

    #[test]
    fn test_expired_clock_returns_root_as_wait() {
        let input = opening_input();
        let solution =
            search_with(&input, &test_config(1_000), &ExpiredClock, &mut NoopObserver).unwrap();
        assert_eq!(solution.stop, StopReason::TimeBudget);
        assert!(solution.best.is_root());
        assert!(solution.actions.is_empty());
        assert_eq!(solution.first_action(), Action::Wait);
    }

    #[test]
    fn test_search_is_deterministic() {
        let input = opening_input();
        let config = test_config(2_000);
        let first = search_with(&input, &config, &FrozenClock, &mut NoopObserver).unwrap();
        let second = search_with(&input, &config, &FrozenClock, &mut NoopObserver).unwrap();
        assert_eq!(first.first_action(), second.first_action());
        assert_eq!(first.actions, second.actions);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_expansion_limit_is_respected() {
        let input = opening_input();
        let mut observer = CountingObserver::default();
        let solution = search_with(&input, &test_config(100), &FrozenClock, &mut observer).unwrap();
        assert_eq!(solution.stop, StopReason::ExpansionLimit);
        assert_eq!(solution.stats.expanded, 100);
        assert_eq!(observer.expanded, 100);
        assert_eq!(solution.actions.len() as u32, solution.best.path_length());
    }

    #[test]
    fn test_clock_is_read_every_interval() {
        let input = opening_input();
        let clock = CountingClock::default();
        let solution =
            search_with(&input, &test_config(1_000), &clock, &mut NoopObserver).unwrap();

        assert_eq!(solution.stop, StopReason::ExpansionLimit);
        assert_eq!(solution.stats.expanded, 1_000);
        // Once at 0, 50, ..., 950; the closing log line may add one more read.
        let reads = clock.reads.get();
        assert!((20..=21).contains(&reads), "clock read {} times", reads);
    }

    #[test]
    fn test_overflow_keeps_partial_best() {
        let input = opening_input();
        let config = SearchConfig {
            queue_capacity: 8,
            ..test_config(1_000)
        };
        let mut observer = CountingObserver::default();
        let solution = search_with(&input, &config, &FrozenClock, &mut observer).unwrap();
        assert_eq!(solution.stop, StopReason::QueueOverflow);
        assert!(solution.stats.peak_queue <= 8);
        // The root is enqueued without an action; the step that overflowed is not counted.
        let successors = observer.rests + observer.brews + observer.casts + observer.learns;
        assert_eq!(successors + 1, solution.stats.enqueued);
    }

    #[test]
    fn test_invalid_capacity_is_an_error() {
        let config = SearchConfig {
            queue_capacity: 1000,
            ..SearchConfig::default()
        };
        let result = search(&opening_input(), &config);
        assert_eq!(
            result.err(),
            Some(SearchError::Queue(QueueError::CapacityNotPowerOfTwo(1000)))
        );
    }

    #[test]
    fn test_no_moves_past_turn_limit() {
        let input = TurnInput {
            turns_remaining: 0,
            ..opening_input()
        };
        let solution =
            search_with(&input, &test_config(10_000), &FrozenClock, &mut NoopObserver).unwrap();
        assert_eq!(solution.stop, StopReason::QueueExhausted);
        assert!(solution.best.path_length() <= 2);
    }

    #[test]
    fn test_wall_clock_search_returns_legal_action() {
        let input = opening_input();
        let config = SearchConfig {
            queue_capacity: 1 << 20,
            ..SearchConfig::default()
        };
        let solution = search(&input, &config).unwrap();
        assert!(!solution.best.is_root());
        assert_ne!(solution.first_action(), Action::Wait);
    }
}
