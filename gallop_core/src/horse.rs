//! Horse registry.
//!
//! Owns the pool every program draws its rosters from. Horses are immutable
//! once created; ids stay unique for the registry's lifetime, including ids
//! handed out by `generate_unique_id` that were never attached to a horse.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Horse identifier.
pub type HorseId = u32;

/// Upper bound (exclusive) of randomly generated ids.
pub const MAX_GENERATED_ID: HorseId = 1_000_000;

/// Random draws attempted before falling back to the next free id.
const ID_DRAW_ATTEMPTS: usize = 64;

const HORSE_NAMES: [&str; 20] = [
    "Thunder", "Lightning", "Storm", "Blaze", "Shadow",
    "Spirit", "Comet", "Star", "Midnight", "Phoenix",
    "Apollo", "Zeus", "Atlas", "Titan", "Hercules",
    "Maverick", "Rebel", "Champion", "Victory", "Legend",
];

const HORSE_COLORS: [&str; 20] = [
    "#8B4513", "#000000", "#D2691E", "#808080", "#FFD700",
    "#C19A6B", "#CD853F", "#B8860B", "#A52A2A", "#FFFFFF",
    "#4A2511", "#2F1B0C", "#654321", "#8B7355", "#964B00",
    "#E97451", "#BC8F8F", "#F4A460", "#DEB887", "#D2B48C",
];

/// A horse entered in races.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horse {
    /// Unique id within the registry
    pub id: HorseId,

    /// Display name (may repeat across horses)
    pub name: String,

    /// Hex color used by the track renderer, e.g. "#8B4513"
    pub color: String,

    /// Form score in [1, 100]; higher runs faster
    pub condition_score: u8,
}

impl Horse {
    /// Creates a horse, clamping the condition score into [1, 100].
    pub fn new(id: HorseId, name: impl Into<String>, color: impl Into<String>, condition_score: u8) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            condition_score: condition_score.clamp(1, 100),
        }
    }

    /// Condition score as a fraction in (0, 1].
    pub fn condition_ratio(&self) -> f64 {
        f64::from(self.condition_score) / 100.0
    }
}

/// Caller-supplied fields for `HorseRegistry::add_horse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHorse {
    pub name: String,
    pub color: String,
}

impl NewHorse {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

/// The pool of horses.
#[derive(Debug, Clone, Default)]
pub struct HorseRegistry {
    /// All horses, in creation order
    horses: Vec<Horse>,

    /// Every id ever handed out
    issued_ids: HashSet<HorseId>,
}

impl HorseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `count` generated horses, ids `1..=count`.
    ///
    /// Names cycle through a fixed list; repeats get a numeric suffix
    /// ("Thunder", ..., "Thunder 2").
    pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut registry = Self::new();
        let mut used_names = HashSet::new();

        for i in 0..count {
            let mut name = HORSE_NAMES[i % HORSE_NAMES.len()].to_string();
            if used_names.contains(&name) {
                name = format!("{} {}", name, i / HORSE_NAMES.len() + 1);
            }
            used_names.insert(name.clone());

            let id = (i + 1) as HorseId;
            registry.insert(Horse::new(id, name, random_color(rng), random_condition(rng)));
        }

        registry
    }

    /// Returns all horses in creation order.
    pub fn horses(&self) -> &[Horse] {
        &self.horses
    }

    /// Looks up a horse by id.
    pub fn get(&self, id: HorseId) -> Option<&Horse> {
        self.horses.iter().find(|h| h.id == id)
    }

    /// Number of horses in the pool.
    pub fn len(&self) -> usize {
        self.horses.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }

    /// Reserves an id no horse has and no earlier call returned.
    pub fn generate_unique_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> HorseId {
        for _ in 0..ID_DRAW_ATTEMPTS {
            let candidate = rng.gen_range(0..MAX_GENERATED_ID);
            if self.issued_ids.insert(candidate) {
                return candidate;
            }
        }

        // Dense id space: take the next id above everything issued so far.
        let next = self.issued_ids.iter().max().map_or(0, |max| max + 1);
        self.issued_ids.insert(next);
        next
    }

    /// Adds a horse with the given name and color and a random condition score.
    pub fn add_horse<R: Rng + ?Sized>(&mut self, new_horse: NewHorse, rng: &mut R) -> Horse {
        let id = self.generate_unique_id(rng);
        let horse = Horse::new(id, new_horse.name, new_horse.color, random_condition(rng));
        self.insert(horse.clone());
        horse
    }

    fn insert(&mut self, horse: Horse) {
        self.issued_ids.insert(horse.id);
        self.horses.push(horse);
    }
}

fn random_condition<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=100)
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    HORSE_COLORS
        .choose(rng)
        .copied()
        .unwrap_or(HORSE_COLORS[0])
        .to_string()
}
