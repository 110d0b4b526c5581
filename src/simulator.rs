//! Local referee for offline play.
//!
//! `Game` keeps the full state of a single-player game: the shuffled tome and
//! order decks, the visible tome and orders, the player's spells, inventory,
//! score and turn counter. It validates every action it is given, so it can be
//! used to check the search's choices as well as to benchmark it.
//!
//! The decks are shuffled with a seeded `SmallRng`, so a seed fully determines
//! a game.
use crate::engine::{
    Action, Inventory, LearnableSpell, Recipe, Spell, SpellDescriptor, INVENTORY_CAPACITY,
    MAX_CAST_TIMES,
};
use crate::solver::{search, SearchConfig, SearchError, TurnInput};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

/// Length of a game in turns.
pub const TOTAL_TURNS: u32 = 100;
/// The game also ends once this many potions have been brewed.
pub const POTIONS_TO_FINISH: u32 = 6;
pub const VISIBLE_TOME: usize = 6;
pub const VISIBLE_ORDERS: usize = 5;
pub const STARTING_INVENTORY: [i32; 4] = [3, 0, 0, 0];

static TOME_DECK: &[[i32; 4]] = &[
    [-3, 0, 0, 1],
    [3, -1, 0, 0],
    [1, 1, 0, 0],
    [0, 0, 1, 0],
    [3, 0, 0, 0],
    [2, 3, -2, 0],
    [2, 1, -2, 1],
    [3, 0, 1, -1],
    [3, -2, 1, 0],
    [2, -3, 2, 0],
    [2, 2, 0, -1],
    [-4, 0, 2, 0],
    [2, 1, 0, 0],
    [4, 0, 0, 0],
    [0, 0, 0, 1],
    [0, 2, 0, 0],
    [1, 0, 1, 0],
    [-2, 0, 1, 0],
    [-1, -1, 0, 1],
    [0, 2, -1, 0],
    [2, -2, 0, 1],
    [-3, 1, 1, 0],
    [0, 2, -2, 1],
    [1, -3, 1, 1],
    [0, 3, 0, -1],
    [0, -3, 0, 2],
    [1, 1, 1, -1],
    [1, 2, -1, 0],
    [4, 1, -1, 0],
    [-5, 0, 0, 2],
    [-4, 0, 1, 1],
    [0, 3, 2, -2],
    [1, 1, 3, -2],
    [-5, 0, 3, 0],
    [-2, 0, -1, 2],
    [0, 0, -3, 3],
    [0, -3, 3, 0],
    [-3, 3, 0, 0],
    [-2, 2, 0, 0],
    [0, 0, -2, 2],
    [0, -2, 2, 0],
    [0, 0, 2, -1],
];

/// Ingredients required per tier, then the reward.
static ORDER_DECK: &[[i32; 5]] = &[
    [2, 2, 0, 0, 6],
    [3, 2, 0, 0, 7],
    [0, 4, 0, 0, 8],
    [2, 0, 2, 0, 8],
    [2, 3, 0, 0, 8],
    [3, 0, 2, 0, 9],
    [0, 2, 2, 0, 10],
    [0, 5, 0, 0, 10],
    [2, 0, 0, 2, 10],
    [2, 0, 3, 0, 11],
    [3, 0, 0, 2, 11],
    [0, 0, 4, 0, 12],
    [0, 2, 0, 2, 12],
    [0, 3, 2, 0, 12],
    [0, 2, 3, 0, 13],
    [0, 0, 2, 2, 14],
    [0, 3, 0, 2, 14],
    [2, 0, 0, 3, 14],
    [0, 0, 5, 0, 15],
    [0, 0, 0, 4, 16],
    [0, 2, 0, 3, 16],
    [0, 0, 3, 2, 17],
    [0, 0, 2, 3, 18],
    [0, 0, 0, 5, 20],
    [2, 1, 0, 1, 9],
    [0, 2, 1, 1, 12],
    [1, 0, 2, 1, 12],
    [2, 2, 2, 0, 13],
    [2, 2, 0, 2, 15],
    [2, 0, 2, 2, 17],
    [0, 2, 2, 2, 19],
    [1, 1, 1, 1, 12],
    [3, 1, 1, 1, 14],
    [1, 3, 1, 1, 16],
    [1, 1, 3, 1, 18],
    [1, 1, 1, 3, 20],
];

static STARTING_SPELLS: &[[i32; 4]] = &[[2, 0, 0, 0], [-1, 1, 0, 0], [0, -1, 1, 0], [0, 0, -1, 1]];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("the game is already over")]
    GameOver,
    #[error("no {kind} with id {id}")]
    UnknownId { kind: &'static str, id: u32 },
    #[error("cannot afford {0}")]
    Unaffordable(Action),
    #[error("spell {0} is exhausted")]
    Exhausted(u32),
    #[error("{0} would overflow the inventory")]
    OverCapacity(Action),
    #[error("invalid multiplier in {0}")]
    InvalidTimes(Action),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Spells whose price takes something are repeatable.
fn descriptor_from(id: u32, price: [i32; 4]) -> SpellDescriptor {
    SpellDescriptor::new(id, Inventory::new(price), price.iter().any(|v| *v < 0))
}

#[derive(Clone, Debug)]
pub struct Game {
    inventory: Inventory,
    spells: Vec<Spell>,
    tome: Vec<LearnableSpell>,
    tome_deck: VecDeque<SpellDescriptor>,
    orders: Vec<Recipe>,
    order_deck: VecDeque<Recipe>,
    score: u32,
    brewed: u32,
    turn: u32,
}

impl Game {
    /// Creates a game whose decks are shuffled from `seed`.
    ///
    /// Ids are assigned in order: orders first, then tome spells, then the
    /// starting spells.
    pub fn new_with_seed(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut next_id = 0u32;
        let mut take_id = || {
            next_id += 1;
            next_id
        };

        let mut orders: Vec<Recipe> = ORDER_DECK
            .iter()
            .map(|o| Recipe::new(take_id(), Inventory::new([-o[0], -o[1], -o[2], -o[3]]), o[4] as u32))
            .collect();
        let mut tome: Vec<SpellDescriptor> =
            TOME_DECK.iter().map(|p| descriptor_from(take_id(), *p)).collect();
        let spells: Vec<Spell> = STARTING_SPELLS
            .iter()
            .map(|p| Spell::new(descriptor_from(take_id(), *p)))
            .collect();

        tome.shuffle(&mut rng);
        orders.shuffle(&mut rng);
        let mut tome_deck: VecDeque<SpellDescriptor> = tome.into();
        let mut order_deck: VecDeque<Recipe> = orders.into();

        let visible_tome = tome_deck
            .drain(..VISIBLE_TOME)
            .map(|descriptor| LearnableSpell {
                descriptor,
                reward: 0,
            })
            .collect();
        let visible_orders = order_deck.drain(..VISIBLE_ORDERS).collect();

        Game {
            inventory: Inventory::new(STARTING_INVENTORY),
            spells,
            tome: visible_tome,
            tome_deck,
            orders: visible_orders,
            order_deck,
            score: 0,
            brewed: 0,
            turn: 0,
        }
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn tome(&self) -> &[LearnableSpell] {
        &self.tome
    }

    pub fn orders(&self) -> &[Recipe] {
        &self.orders
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn brewed(&self) -> u32 {
        self.brewed
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn is_game_over(&self) -> bool {
        self.brewed >= POTIONS_TO_FINISH || self.turn >= TOTAL_TURNS
    }

    /// The bundle the search works from for the current turn.
    pub fn turn_input(&self) -> TurnInput {
        TurnInput {
            inventory: self.inventory,
            spells: self.spells.clone(),
            learnables: self.tome.clone(),
            recipes: self.orders.clone(),
            turns_elapsed: self.turn,
            turns_remaining: TOTAL_TURNS.saturating_sub(self.turn),
        }
    }

    /// Plays `action` and advances the turn counter.
    ///
    /// The game is left unchanged when an error is returned.
    pub fn apply(&mut self, action: Action) -> Result<(), SimulationError> {
        if self.is_game_over() {
            return Err(SimulationError::GameOver);
        }
        match action {
            Action::Wait => {}
            Action::Rest => {
                for spell in self.spells.iter_mut() {
                    spell.exhausted = false;
                }
            }
            Action::Brew { id } => self.brew(action, id)?,
            Action::Cast { id, times } => self.cast(action, id, times)?,
            Action::Learn { id } => self.learn(action, id)?,
        }
        self.turn += 1;
        Ok(())
    }

    fn brew(&mut self, action: Action, id: u32) -> Result<(), SimulationError> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(SimulationError::UnknownId { kind: "order", id })?;
        let order = self.orders[index];
        if !order.affordable(&self.inventory) {
            return Err(SimulationError::Unaffordable(action));
        }
        self.inventory = self.inventory.added(&order.delta);
        self.score += order.reward;
        self.brewed += 1;
        self.orders.remove(index);
        if let Some(next) = self.order_deck.pop_front() {
            self.orders.push(next);
        }
        Ok(())
    }

    fn cast(&mut self, action: Action, id: u32, times: u32) -> Result<(), SimulationError> {
        let spell = self
            .spells
            .iter_mut()
            .find(|s| s.descriptor.id == id)
            .ok_or(SimulationError::UnknownId { kind: "spell", id })?;
        if times == 0 || times > MAX_CAST_TIMES || (times > 1 && !spell.descriptor.repeatable) {
            return Err(SimulationError::InvalidTimes(action));
        }
        if spell.exhausted {
            return Err(SimulationError::Exhausted(id));
        }
        let delta = spell.descriptor.price.scaled(times as i32);
        if !self.inventory.covers(&delta) {
            return Err(SimulationError::Unaffordable(action));
        }
        let inventory = self.inventory.added(&delta);
        if inventory.total() > INVENTORY_CAPACITY {
            return Err(SimulationError::OverCapacity(action));
        }
        spell.exhausted = true;
        self.inventory = inventory;
        Ok(())
    }

    fn learn(&mut self, action: Action, id: u32) -> Result<(), SimulationError> {
        let index = self
            .tome
            .iter()
            .position(|l| l.descriptor.id == id)
            .ok_or(SimulationError::UnknownId { kind: "tome spell", id })?;
        let cost = index as i32;
        if self.inventory.tier(0) < cost {
            return Err(SimulationError::Unaffordable(action));
        }
        let learned = self.tome.remove(index);
        for earlier in self.tome.iter_mut().take(index) {
            earlier.reward += 1;
        }
        let room = (INVENTORY_CAPACITY - (self.inventory.total() - cost)).max(0);
        self.inventory.0[0] += (learned.reward as i32).min(room) - cost;
        self.spells.push(Spell::new(learned.descriptor));
        if let Some(descriptor) = self.tome_deck.pop_front() {
            self.tome.push(LearnableSpell {
                descriptor,
                reward: 0,
            });
        }
        Ok(())
    }
}

/// Outcome of a game played by the search against the referee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSummary {
    pub seed: u64,
    pub score: u32,
    pub brewed: u32,
    pub turns: u32,
}

/// Plays a whole game with `config`, asking the search for every move.
pub fn play_game(seed: u64, config: &SearchConfig) -> Result<GameSummary, SimulationError> {
    let mut game = Game::new_with_seed(seed);
    while !game.is_game_over() {
        let solution = search(&game.turn_input(), config)?;
        let action = solution.first_action();
        debug!(turn = game.turn(), %action, expanded = solution.stats.expanded, "playing");
        game.apply(action)?;
    }
    Ok(GameSummary {
        seed,
        score: game.score(),
        brewed: game.brewed(),
        turns: game.turn(),
    })
}
