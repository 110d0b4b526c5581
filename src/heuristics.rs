use crate::engine::{Inventory, Recipe, Step, TIERS};

/// Tunable constants of the priority formula.
///
/// None of these values is derived; they are tuning knobs. `self_play`
/// exposes some of them on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Multiplier on the reward realized along the path.
    pub realized: f64,
    /// Constant from which a pending recipe's distance is subtracted before
    /// multiplying by its reward.
    pub proximity_base: f64,
    /// Per-ingredient value of holding each tier.
    pub tier_values: [f64; TIERS],
    /// Bonus per spell in the book.
    pub spell_bonus: f64,
    /// Decayed bonus per recipe brewed on the path.
    pub brewed_bonus: f64,
    /// Decayed bonus per point of realized reward.
    pub score_bonus: f64,
    /// Base of the decay, raised to the estimated number of turns.
    pub decay: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            realized: 100.0,
            proximity_base: 10.0,
            tier_values: [0.0, 1.0, 2.0, 3.0],
            spell_bonus: 20.0,
            brewed_bonus: 50.0,
            score_bonus: 10.0,
            decay: 0.95,
        }
    }
}

/// Computes queue priorities for steps of one search call.
///
/// Holds the weights plus the number of turns already played in the game,
/// which the formula adds to each path's length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoreWeights,
    turns_elapsed: u32,
}

impl Scorer {
    pub fn new(weights: ScoreWeights, turns_elapsed: u32) -> Self {
        Scorer {
            weights,
            turns_elapsed,
        }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Estimated turns to reach `step`: game turns so far plus the path length,
    /// never less than one.
    pub fn estimated_turns(&self, step: &Step) -> f64 {
        f64::from((self.turns_elapsed + step.path_length()).max(1))
    }

    /// Priority of `step`; higher is expanded first.
    ///
    /// The undecayed part (realized score, recipe proximity, held ingredients,
    /// spell count) is divided by the estimated turns. Two bonuses scaled by
    /// `decay ^ estimated_turns` are then added, one per brewed recipe and one
    /// per point of realized score, so that of two equally scoring paths the
    /// shorter one wins.
    pub fn score(&self, step: &Step) -> f64 {
        let w = &self.weights;
        let inventory = step.inventory();
        let score = f64::from(step.score());

        let mut subtotal = w.realized * score;
        subtotal += step
            .recipes()
            .iter()
            .map(|recipe| self.proximity(&inventory, recipe))
            .sum::<f64>();
        subtotal += inventory
            .0
            .iter()
            .zip(w.tier_values)
            .map(|(held, value)| f64::from(*held) * value)
            .sum::<f64>();
        subtotal += w.spell_bonus * step.spells().len() as f64;

        let turns = self.estimated_turns(step);
        let decay = w.decay.powf(turns);
        subtotal / turns
            + w.brewed_bonus * step.brewed().len() as f64 * decay
            + w.score_bonus * score * decay
    }

    fn proximity(&self, inventory: &Inventory, recipe: &Recipe) -> f64 {
        let distance = f64::from(recipe_distance(inventory, recipe));
        (self.weights.proximity_base - distance) * f64::from(recipe.reward)
    }
}

/// Ingredients still missing before `recipe` can be brewed from `inventory`.
pub fn recipe_distance(inventory: &Inventory, recipe: &Recipe) -> i32 {
    inventory.shortfall(&recipe.delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LearnableSpell, Spell, SpellDescriptor};
    use std::rc::Rc;

    fn recipe(id: u32, delta: [i32; 4], reward: u32) -> Recipe {
        Recipe::new(id, Inventory::new(delta), reward)
    }

    #[test]
    fn test_recipe_distance() {
        let r = recipe(1, [-2, 0, -1, 0], 5);
        assert_eq!(recipe_distance(&Inventory::new([0, 0, 0, 0]), &r), 3);
        assert_eq!(recipe_distance(&Inventory::new([1, 3, 1, 0]), &r), 1);
        assert_eq!(recipe_distance(&Inventory::new([5, 0, 2, 0]), &r), 0);
    }

    #[test]
    fn test_root_score_matches_formula() {
        let weights = ScoreWeights::default();
        let scorer = Scorer::new(weights, 4);
        let root = Step::root(
            Inventory::new([1, 2, 0, 1]),
            vec![Spell::new(SpellDescriptor::new(1, Inventory::new([2, 0, 0, 0]), false))],
            vec![],
            vec![recipe(9, [0, -3, 0, 0], 10)],
            &scorer,
        );
        // proximity: (10 - 1) * 10 = 90; tiers: 2*1 + 1*3 = 5; spells: 20.
        let expected = (90.0 + 5.0 + 20.0) / 4.0;
        assert!((root.priority() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_closer_inventory_scores_higher() {
        let scorer = Scorer::default();
        let recipes = vec![recipe(1, [0, -2, 0, 0], 10)];
        let far = Step::root(Inventory::EMPTY, vec![], vec![], recipes.clone(), &scorer);
        let near = Step::root(Inventory::new([0, 1, 0, 0]), vec![], vec![], recipes, &scorer);
        assert!(near.priority() > far.priority());
    }

    #[test]
    fn test_faster_brew_beats_slower_brew() {
        let scorer = Scorer::new(ScoreWeights::default(), 10);
        let root = Step::root(
            Inventory::new([0, 2, 0, 0]),
            vec![],
            vec![],
            vec![recipe(1, [0, -2, 0, 0], 10)],
            &scorer,
        );
        let fast = Step::brew(&root, 0, &scorer).unwrap();
        let rested = Step::rest(&root, &scorer);
        let slow = Step::brew(&Step::rest(&rested, &scorer), 0, &scorer).unwrap();
        assert_eq!(fast.score(), slow.score());
        assert!(fast.priority() > slow.priority());
    }

    #[test]
    fn test_learning_raises_priority() {
        let scorer = Scorer::default();
        let root = Step::root(
            Inventory::EMPTY,
            vec![],
            vec![LearnableSpell {
                descriptor: SpellDescriptor::new(3, Inventory::new([0, 1, 0, 0]), false),
                reward: 0,
            }],
            vec![recipe(1, [0, -1, 0, 0], 10)],
            &scorer,
        );
        let learned = Step::learn(&root, 0, &scorer).unwrap();
        let rested: Rc<Step> = Step::rest(&root, &scorer);
        assert!(learned.priority() > rested.priority());
    }
}
