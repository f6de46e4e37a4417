//! Candidate project id generation.
//!
//! The allocator asks a [`SlugSource`] for candidates and checks each one
//! against the bucket namespace. [`RandomSlugs`] draws three words
//! (adjective-adjective-noun, e.g. `calm-eager-otter`) from a fixed
//! dictionary; with 64 adjectives and 64 nouns there are about 262k
//! combinations, all valid bucket names.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Built-in adjective pool.
const ADJECTIVES: &[&str] = &[
    "able", "amber", "ancient", "autumn", "bold", "brave", "breezy", "bright",
    "calm", "clever", "cool", "cosmic", "crisp", "curly", "daring", "dazzling",
    "eager", "early", "electric", "fancy", "fast", "fluffy", "gentle", "giant",
    "glad", "golden", "happy", "hidden", "honest", "jolly", "keen", "kind",
    "late", "lively", "lucky", "mellow", "misty", "modern", "noble", "odd",
    "polite", "proud", "quick", "quiet", "rapid", "red", "rustic", "shiny",
    "silent", "silver", "sleepy", "smooth", "snowy", "solid", "sunny", "swift",
    "tidy", "tiny", "vivid", "warm", "wild", "wise", "young", "zesty",
];

/// Built-in noun pool.
const NOUNS: &[&str] = &[
    "badger", "beacon", "bison", "breeze", "canyon", "cedar", "comet", "coral",
    "crane", "delta", "dune", "eagle", "ember", "falcon", "fern", "fjord",
    "forest", "fox", "galaxy", "garden", "glacier", "harbor", "hawk", "heron",
    "island", "jaguar", "lagoon", "lantern", "lark", "lemur", "lynx", "maple",
    "meadow", "meteor", "moose", "nebula", "oasis", "ocean", "orchid", "otter",
    "owl", "panda", "pebble", "pine", "planet", "prairie", "quartz", "raven",
    "reef", "river", "robin", "salmon", "sparrow", "summit", "thunder", "tiger",
    "tundra", "valley", "violet", "walrus", "willow", "wolf", "yak", "zebra",
];

/// A source of candidate project ids.
///
/// Implementations must be cheap and non-blocking; the allocator calls
/// [`next_candidate`](SlugSource::next_candidate) once per attempt.
pub trait SlugSource: Send + Sync {
    /// Produce the next candidate name.
    fn next_candidate(&self) -> String;
}

/// Random three-word slugs from the built-in dictionary.
#[derive(Debug)]
pub struct RandomSlugs {
    rng: Mutex<StdRng>,
}

impl RandomSlugs {
    /// Seed from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSlugs {
    fn default() -> Self {
        Self::new()
    }
}

impl SlugSource for RandomSlugs {
    fn next_candidate(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        generate_slug(&mut *rng)
    }
}

/// Draw one adjective-adjective-noun slug from `rng`.
pub fn generate_slug<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = ADJECTIVES.choose(rng).copied().unwrap_or("quiet");
    let second = ADJECTIVES.choose(rng).copied().unwrap_or("swift");
    let noun = NOUNS.choose(rng).copied().unwrap_or("otter");
    format!("{first}-{second}-{noun}")
}

#[cfg(test)]
mod tests {
    use shipyard_types::ProjectId;

    use super::*;

    #[test]
    fn generated_slugs_are_valid_project_ids() {
        let slugs = RandomSlugs::seeded(7);
        for _ in 0..500 {
            let slug = slugs.next_candidate();
            assert!(ProjectId::parse(slug.as_str()).is_ok(), "{slug} is not a valid id");
            assert_eq!(slug.split('-').count(), 3);
        }
    }

    #[test]
    fn seeded_sources_repeat() {
        let a = RandomSlugs::seeded(42);
        let b = RandomSlugs::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.next_candidate(), b.next_candidate());
        }
    }

    #[test]
    fn dictionary_words_are_lowercase_ascii() {
        for word in ADJECTIVES.iter().chain(NOUNS) {
            assert!(word.bytes().all(|b| b.is_ascii_lowercase()), "{word}");
        }
    }
}
