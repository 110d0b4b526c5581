//! Core game model for the potion-brewing engine.
//!
//! This module defines the game's fundamental components:
//! - `Inventory`: the four ingredient tiers and their capacity arithmetic.
//! - `Recipe`, `SpellDescriptor`, `Spell`, `LearnableSpell`: what a turn can act on.
//! - `Action`: one command the bot can emit.
//! - `Step`: an immutable, parent-linked snapshot of a hypothetical sequence of
//!   turns, together with the four action generators (`rest`, `brew`, `cast`,
//!   `learn`) that derive successor steps from it.
use crate::heuristics::Scorer;
use std::fmt;
use std::rc::Rc;

/// Number of ingredient tiers.
pub const TIERS: usize = 4;

/// Maximum number of ingredients a player may hold at once.
pub const INVENTORY_CAPACITY: i32 = 10;

/// Largest multiplier accepted by a repeatable spell in a single cast.
pub const MAX_CAST_TIMES: u32 = 4;

/// Ingredient counts (or deltas) for the four tiers, lowest tier first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Inventory(pub [i32; TIERS]);

impl Inventory {
    pub const EMPTY: Inventory = Inventory([0; TIERS]);

    pub fn new(tiers: [i32; TIERS]) -> Self {
        Inventory(tiers)
    }

    pub fn tier(&self, tier: usize) -> i32 {
        self.0[tier]
    }

    /// Sum of all four tiers.
    pub fn total(&self) -> i32 {
        self.0.iter().sum()
    }

    /// Component-wise sum of `self` and `delta`.
    pub fn added(&self, delta: &Inventory) -> Inventory {
        let mut out = self.0;
        for (slot, d) in out.iter_mut().zip(delta.0) {
            *slot += d;
        }
        Inventory(out)
    }

    pub fn scaled(&self, times: i32) -> Inventory {
        Inventory(self.0.map(|v| v * times))
    }

    /// Whether applying `delta` keeps every tier non-negative.
    ///
    /// # Examples
    /// ```
    /// use potion_solver::engine::Inventory;
    /// let held = Inventory::new([2, 1, 0, 0]);
    /// assert!(held.covers(&Inventory::new([-2, 0, 1, 0])));
    /// assert!(!held.covers(&Inventory::new([0, -2, 0, 0])));
    /// ```
    pub fn covers(&self, delta: &Inventory) -> bool {
        self.0.iter().zip(delta.0).all(|(held, d)| held + d >= 0)
    }

    /// Total quantity taken away by this delta (sum of negative components, negated).
    pub fn consumed(&self) -> i32 {
        -self.0.iter().filter(|v| **v < 0).sum::<i32>()
    }

    /// Total quantity added by this delta (sum of positive components).
    pub fn produced(&self) -> i32 {
        self.0.iter().filter(|v| **v > 0).sum()
    }

    /// How many ingredients are still missing before `requirement` (a delta
    /// with non-positive components) can be paid, floored at zero per tier.
    pub fn shortfall(&self, requirement: &Inventory) -> i32 {
        self.0
            .iter()
            .zip(requirement.0)
            .map(|(held, d)| (-d - held).max(0))
            .sum()
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "[{} {} {} {}]", a, b, c, d)
    }
}

/// A potion order that can be brewed once for `reward` points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipe {
    pub id: u32,
    /// Ingredients consumed, as a non-positive delta applied on brewing.
    pub delta: Inventory,
    /// Sum of `delta`'s components.
    pub total: i32,
    pub reward: u32,
}

impl Recipe {
    pub fn new(id: u32, delta: Inventory, reward: u32) -> Self {
        Recipe {
            id,
            delta,
            total: delta.total(),
            reward,
        }
    }

    /// A recipe is brewable when the inventory holds at least as many
    /// ingredients as the recipe uses and no tier would go negative.
    pub fn affordable(&self, inventory: &Inventory) -> bool {
        inventory.total() >= self.total.abs() && inventory.covers(&self.delta)
    }
}

/// The fixed part of a spell, shared by castable and learnable spells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpellDescriptor {
    pub id: u32,
    /// Signed per-tier change produced by one cast.
    pub price: Inventory,
    pub repeatable: bool,
    /// Net change in inventory size for one cast.
    pub delta: i32,
    pub consumed: i32,
    pub produced: i32,
}

impl SpellDescriptor {
    pub fn new(id: u32, price: Inventory, repeatable: bool) -> Self {
        SpellDescriptor {
            id,
            price,
            repeatable,
            delta: price.total(),
            consumed: price.consumed(),
            produced: price.produced(),
        }
    }
}

/// A spell in the player's book. `exhausted` is local to a search path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spell {
    pub descriptor: SpellDescriptor,
    pub exhausted: bool,
}

impl Spell {
    pub fn new(descriptor: SpellDescriptor) -> Self {
        Spell {
            descriptor,
            exhausted: false,
        }
    }
}

/// A spell still in the tome. Its tome position is its index in the
/// learnable list, which is kept in tome order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LearnableSpell {
    pub descriptor: SpellDescriptor,
    /// Tier-0 ingredients granted when this spell is learned.
    pub reward: u32,
}

/// A single command for the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Wait,
    Rest,
    Brew { id: u32 },
    Cast { id: u32, times: u32 },
    Learn { id: u32 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Wait => write!(f, "WAIT"),
            Action::Rest => write!(f, "REST"),
            Action::Brew { id } => write!(f, "BREW {}", id),
            Action::Learn { id } => write!(f, "LEARN {}", id),
            Action::Cast { id, times: 1 } => write!(f, "CAST {}", id),
            Action::Cast { id, times } => write!(f, "CAST {} {}", id, times),
        }
    }
}

/// One node of the search tree: the game as it would look after a sequence
/// of actions.
///
/// Steps are never modified once shared. Collections that an action does not
/// touch are shared with the parent through `Rc`, so deriving a child only
/// materializes what changed. The `parent` link keeps every ancestor alive
/// for as long as any descendant is reachable.
#[derive(Debug)]
pub struct Step {
    inventory: Inventory,
    inventory_size: i32,
    spells: Rc<Vec<Spell>>,
    learnables: Rc<Vec<LearnableSpell>>,
    recipes: Rc<Vec<Recipe>>,
    brewed: Rc<Vec<u32>>,
    path_length: u32,
    score: u32,
    priority: f64,
    action: Option<Action>,
    parent: Option<Rc<Step>>,
}

impl Step {
    /// Builds the root of a search: path length 0, no action, no parent.
    pub fn root(
        inventory: Inventory,
        spells: Vec<Spell>,
        learnables: Vec<LearnableSpell>,
        recipes: Vec<Recipe>,
        scorer: &Scorer,
    ) -> Rc<Step> {
        let mut root = Step {
            inventory,
            inventory_size: inventory.total(),
            spells: Rc::new(spells),
            learnables: Rc::new(learnables),
            recipes: Rc::new(recipes),
            brewed: Rc::new(Vec::new()),
            path_length: 0,
            score: 0,
            priority: 0.0,
            action: None,
            parent: None,
        };
        root.priority = scorer.score(&root);
        Rc::new(root)
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn inventory_size(&self) -> i32 {
        self.inventory_size
    }

    pub fn spells(&self) -> &[Spell] {
        &self.spells
    }

    pub fn learnables(&self) -> &[LearnableSpell] {
        &self.learnables
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Ids of the recipes brewed along this path, oldest first.
    pub fn brewed(&self) -> &[u32] {
        &self.brewed
    }

    /// Number of actions between the root and this step.
    pub fn path_length(&self) -> u32 {
        self.path_length
    }

    /// Reward accumulated along this path.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// The action that produced this step, `None` for the root.
    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn parent(&self) -> Option<&Rc<Step>> {
        self.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Actions from the root to this step, in the order they are played.
    pub fn actions(&self) -> Vec<Action> {
        let mut actions = Vec::with_capacity(self.path_length as usize);
        let mut node = Some(self);
        while let Some(step) = node {
            if let Some(action) = step.action {
                actions.push(action);
            }
            node = step.parent.as_deref();
        }
        actions.reverse();
        actions
    }

    /// Refreshes every spell. Always feasible.
    pub fn rest(parent: &Rc<Step>, scorer: &Scorer) -> Rc<Step> {
        let mut next = Step::derive(parent, Action::Rest);
        if next.spells.iter().any(|s| s.exhausted) {
            let refreshed = next
                .spells
                .iter()
                .map(|s| Spell {
                    exhausted: false,
                    ..*s
                })
                .collect();
            next.spells = Rc::new(refreshed);
        }
        next.publish(scorer)
    }

    /// Brews the recipe at `index`, or returns `None` if it is not affordable.
    ///
    /// # Panics
    /// If `index` is out of range for `parent.recipes()`.
    pub fn brew(parent: &Rc<Step>, index: usize, scorer: &Scorer) -> Option<Rc<Step>> {
        let recipe = parent.recipes[index];
        if !recipe.affordable(&parent.inventory) {
            return None;
        }
        let mut next = Step::derive(parent, Action::Brew { id: recipe.id });
        next.set_inventory(parent.inventory.added(&recipe.delta));
        next.score += recipe.reward;

        let mut recipes = parent.recipes.as_ref().clone();
        recipes.remove(index);
        next.recipes = Rc::new(recipes);

        let mut brewed = parent.brewed.as_ref().clone();
        brewed.push(recipe.id);
        next.brewed = Rc::new(brewed);

        Some(next.publish(scorer))
    }

    /// Casts the spell at `index` `times` times in one action.
    ///
    /// Returns `None` when the spell is exhausted on this path, when a
    /// non-repeatable spell is asked for more than one cast, when any tier
    /// would go negative, or when the result would exceed
    /// [`INVENTORY_CAPACITY`].
    ///
    /// # Panics
    /// If `index` is out of range or `times` is not in `1..=MAX_CAST_TIMES`.
    pub fn cast(parent: &Rc<Step>, index: usize, times: u32, scorer: &Scorer) -> Option<Rc<Step>> {
        assert!(
            (1..=MAX_CAST_TIMES).contains(&times),
            "cast multiplier {} out of range",
            times
        );
        let spell = parent.spells[index];
        if spell.exhausted || (times > 1 && !spell.descriptor.repeatable) {
            return None;
        }
        let delta = spell.descriptor.price.scaled(times as i32);
        if !parent.inventory.covers(&delta) {
            return None;
        }
        let inventory = parent.inventory.added(&delta);
        if inventory.total() > INVENTORY_CAPACITY {
            return None;
        }

        let mut next = Step::derive(
            parent,
            Action::Cast {
                id: spell.descriptor.id,
                times,
            },
        );
        next.set_inventory(inventory);
        let mut spells = parent.spells.as_ref().clone();
        spells[index].exhausted = true;
        next.spells = Rc::new(spells);
        Some(next.publish(scorer))
    }

    /// Learns the tome spell at `index`.
    ///
    /// Learning costs `index` tier-0 ingredients, one of which is left on each
    /// earlier tome spell. The spell's reward is added to tier 0, discarding
    /// whatever would not fit under [`INVENTORY_CAPACITY`]. Returns `None` if
    /// the cost cannot be paid.
    ///
    /// # Panics
    /// If `index` is out of range for `parent.learnables()`.
    pub fn learn(parent: &Rc<Step>, index: usize, scorer: &Scorer) -> Option<Rc<Step>> {
        let learnable = parent.learnables[index];
        let cost = index as i32;
        if parent.inventory.tier(0) < cost {
            return None;
        }
        let room = (INVENTORY_CAPACITY - (parent.inventory_size - cost)).max(0);
        let gain = (learnable.reward as i32).min(room);

        let mut next = Step::derive(
            parent,
            Action::Learn {
                id: learnable.descriptor.id,
            },
        );
        let mut inventory = parent.inventory;
        inventory.0[0] += gain - cost;
        next.set_inventory(inventory);

        let mut learnables = parent.learnables.as_ref().clone();
        learnables.remove(index);
        for earlier in learnables.iter_mut().take(index) {
            earlier.reward += 1;
        }
        next.learnables = Rc::new(learnables);

        let mut spells = parent.spells.as_ref().clone();
        spells.push(Spell::new(learnable.descriptor));
        next.spells = Rc::new(spells);

        Some(next.publish(scorer))
    }

    fn derive(parent: &Rc<Step>, action: Action) -> Step {
        Step {
            inventory: parent.inventory,
            inventory_size: parent.inventory_size,
            spells: Rc::clone(&parent.spells),
            learnables: Rc::clone(&parent.learnables),
            recipes: Rc::clone(&parent.recipes),
            brewed: Rc::clone(&parent.brewed),
            path_length: parent.path_length + 1,
            score: parent.score,
            priority: 0.0,
            action: Some(action),
            parent: Some(Rc::clone(parent)),
        }
    }

    fn set_inventory(&mut self, inventory: Inventory) {
        self.inventory = inventory;
        self.inventory_size = inventory.total();
    }

    fn publish(mut self, scorer: &Scorer) -> Rc<Step> {
        self.priority = scorer.score(&self);
        Rc::new(self)
    }
}
