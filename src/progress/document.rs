use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

use super::difficulty::DifficultyTier;
use super::fast_tier::clamp_fast_tier;

/// Current on-disk schema version for [`ProgressDocument`].
pub const SCHEMA_VERSION: u32 = 1;

/// One completion record per `(level_id, difficulty)` pair per character.
///
/// `fast_tier` is monotonic downward-implied: reaching tier T means every
/// tier from 1 to T is also satisfied. 0 means the level is not completed at
/// this difficulty (the entry is retained so un-completing keeps history).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCompletion {
    pub level_id: u32,
    pub difficulty: DifficultyTier,
    pub fast_tier: u8,
}

/// Per-character save data: user-chosen display position plus completions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProgress {
    pub character_id: String,
    pub custom_index: u32,
    pub level_completions: Vec<LevelCompletion>,
}

impl CharacterProgress {
    fn empty(character_id: impl Into<String>, custom_index: u32) -> Self {
        CharacterProgress {
            character_id: character_id.into(),
            custom_index,
            level_completions: Vec::new(),
        }
    }

    /// The completion entry for a level at a difficulty, if recorded.
    pub fn completion(&self, level_id: u32, difficulty: DifficultyTier) -> Option<&LevelCompletion> {
        self.level_completions
            .iter()
            .find(|c| c.level_id == level_id && c.difficulty == difficulty)
    }

    /// Recorded fast tier for a level at a difficulty; 0 when nothing is
    /// recorded.
    pub fn completed_tier(&self, level_id: u32, difficulty: DifficultyTier) -> u8 {
        self.completion(level_id, difficulty)
            .map(|c| c.fast_tier)
            .unwrap_or(0)
    }

    /// Whether the level is complete at a difficulty and fast tier. Tier 0 is
    /// never "complete"; higher recorded tiers imply all lower ones.
    pub fn is_complete_at(&self, level_id: u32, difficulty: DifficultyTier, tier: u8) -> bool {
        tier >= 1 && self.completed_tier(level_id, difficulty) >= tier
    }
}

/// A batch entry for reordering: assign `custom_index` to `character_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexUpdate {
    pub character_id: String,
    pub custom_index: u32,
}

impl IndexUpdate {
    pub fn new(character_id: impl Into<String>, custom_index: u32) -> Self {
        IndexUpdate {
            character_id: character_id.into(),
            custom_index,
        }
    }
}

/// Partial completion value for [`ProgressDocument::upsert_completion`].
/// Absent fields keep their prior values on update, and default to `base` /
/// 0 on insert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompletionUpdate {
    pub difficulty: Option<DifficultyTier>,
    pub fast_tier: Option<u8>,
}

impl CompletionUpdate {
    pub fn at(difficulty: DifficultyTier, fast_tier: u8) -> Self {
        CompletionUpdate {
            difficulty: Some(difficulty),
            fast_tier: Some(fast_tier),
        }
    }
}

/// The full progress payload of one save slot.
///
/// All transformations here are pure with respect to I/O: the durable layer
/// and the facade decide when a document is loaded or persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressDocument {
    pub schema_version: u32,
    pub last_updated: u64,
    pub characters: Vec<CharacterProgress>,
}

impl ProgressDocument {
    /// A fresh document with one empty entry per catalog character, indexed
    /// in roster order.
    pub fn initial(catalog: &Catalog) -> Self {
        ProgressDocument {
            schema_version: SCHEMA_VERSION,
            last_updated: 0,
            characters: catalog
                .ids()
                .iter()
                .enumerate()
                .map(|(index, id)| CharacterProgress::empty(id, index as u32))
                .collect(),
        }
    }

    pub fn character(&self, character_id: &str) -> Option<&CharacterProgress> {
        self.characters
            .iter()
            .find(|c| c.character_id == character_id)
    }

    /// Append entries for catalog characters this document does not know yet.
    ///
    /// New entries get empty completions and indices past the current
    /// maximum, so existing ordering is untouched. Entries for ids no longer
    /// in the catalog are kept; history survives a character being removed
    /// and later restored.
    pub fn reconcile_with_catalog(&mut self, catalog: &Catalog) {
        let known: HashSet<String> = self
            .characters
            .iter()
            .map(|c| c.character_id.clone())
            .collect();

        let mut next_index = self
            .characters
            .iter()
            .map(|c| c.custom_index + 1)
            .max()
            .unwrap_or(0);

        for id in catalog.ids() {
            if known.contains(id.as_str()) {
                continue;
            }
            self.characters.push(CharacterProgress::empty(id, next_index));
            next_index += 1;
        }
    }

    /// Apply index assignments to the named characters only. Partial batches
    /// are fine; other characters keep their indices. Unknown ids are skipped
    /// without aborting the batch.
    pub fn set_custom_indices(&mut self, updates: &[IndexUpdate]) {
        for update in updates {
            match self
                .characters
                .iter_mut()
                .find(|c| c.character_id == update.character_id)
            {
                Some(character) => character.custom_index = update.custom_index,
                None => log::debug!(
                    "ignoring index update for unknown character {}",
                    update.character_id
                ),
            }
        }
    }

    /// Insert or update the completion for `(level_id, difficulty)` on one
    /// character. The difficulty defaults to `base` when the update does not
    /// name one; on insert the fast tier defaults to 0. This is the sole
    /// mutation path for completion state; toggle policy belongs to callers.
    pub fn upsert_completion(&mut self, character_id: &str, level_id: u32, update: CompletionUpdate) {
        let Some(character) = self
            .characters
            .iter_mut()
            .find(|c| c.character_id == character_id)
        else {
            log::debug!("ignoring completion for unknown character {character_id}");
            return;
        };

        let difficulty = update.difficulty.unwrap_or_default();
        match character
            .level_completions
            .iter_mut()
            .find(|c| c.level_id == level_id && c.difficulty == difficulty)
        {
            Some(existing) => {
                if let Some(fast_tier) = update.fast_tier {
                    existing.fast_tier = clamp_fast_tier(fast_tier);
                }
            }
            None => character.level_completions.push(LevelCompletion {
                level_id,
                difficulty,
                fast_tier: clamp_fast_tier(update.fast_tier.unwrap_or(0)),
            }),
        }
    }

    /// Characters in display order: `custom_index` ascending, ties broken by
    /// catalog position. Characters the catalog no longer knows sort after
    /// known ones at the same index.
    pub fn sorted_characters(&self, catalog: &Catalog) -> Vec<CharacterProgress> {
        let mut characters = self.characters.clone();
        characters.sort_by_key(|c| {
            (
                c.custom_index,
                catalog.position(&c.character_id).unwrap_or(usize::MAX),
            )
        });
        characters
    }

    /// Renumber `custom_index` to `0..N-1` in display order, healing the
    /// duplicates and gaps a partial reorder can leave behind. Identity on a
    /// well-formed document.
    pub fn normalize_indices(&mut self, catalog: &Catalog) {
        let mut order: Vec<(u32, usize, usize)> = self
            .characters
            .iter()
            .enumerate()
            .map(|(position, c)| {
                (
                    c.custom_index,
                    catalog.position(&c.character_id).unwrap_or(usize::MAX),
                    position,
                )
            })
            .collect();
        order.sort();

        let ranks: HashMap<usize, u32> = order
            .iter()
            .enumerate()
            .map(|(rank, &(_, _, position))| (position, rank as u32))
            .collect();

        for (position, character) in self.characters.iter_mut().enumerate() {
            if let Some(rank) = ranks.get(&position) {
                character.custom_index = *rank;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(["a", "b", "c"])
    }

    #[test]
    fn initial_indexes_in_roster_order() {
        let doc = ProgressDocument::initial(&catalog());
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.characters.len(), 3);
        for (index, character) in doc.characters.iter().enumerate() {
            assert_eq!(character.custom_index, index as u32);
            assert!(character.level_completions.is_empty());
        }
    }

    #[test]
    fn reconcile_appends_missing_characters() {
        let mut doc = ProgressDocument::initial(&catalog());
        let grown = Catalog::new(["a", "b", "c", "d"]);
        doc.reconcile_with_catalog(&grown);

        assert_eq!(doc.characters.len(), 4);
        let added = doc.character("d").unwrap();
        assert!(added.level_completions.is_empty());
        assert_eq!(added.custom_index, 3);
    }

    #[test]
    fn reconcile_avoids_index_collisions_after_reorder() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.set_custom_indices(&[IndexUpdate::new("a", 7)]);
        doc.reconcile_with_catalog(&Catalog::new(["a", "b", "c", "d"]));

        let added = doc.character("d").unwrap();
        let taken: Vec<u32> = doc
            .characters
            .iter()
            .filter(|c| c.character_id != "d")
            .map(|c| c.custom_index)
            .collect();
        assert!(!taken.contains(&added.custom_index));
        assert_eq!(added.custom_index, 8);
    }

    #[test]
    fn reconcile_keeps_entries_missing_from_catalog() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.reconcile_with_catalog(&Catalog::new(["a"]));
        assert_eq!(doc.characters.len(), 3);
    }

    #[test]
    fn reconcile_twice_is_idempotent() {
        let mut doc = ProgressDocument::initial(&catalog());
        let grown = Catalog::new(["a", "b", "c", "d"]);
        doc.reconcile_with_catalog(&grown);
        let once = doc.clone();
        doc.reconcile_with_catalog(&grown);
        assert_eq!(doc, once);
    }

    #[test]
    fn set_custom_indices_skips_unknown_ids() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.set_custom_indices(&[
            IndexUpdate::new("ghost", 9),
            IndexUpdate::new("b", 0),
        ]);
        assert_eq!(doc.character("b").unwrap().custom_index, 0);
    }

    #[test]
    fn upsert_inserts_with_defaults() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("a", 3, CompletionUpdate::default());

        let completion = doc.character("a").unwrap().completion(3, DifficultyTier::Base);
        assert_eq!(
            completion,
            Some(&LevelCompletion {
                level_id: 3,
                difficulty: DifficultyTier::Base,
                fast_tier: 0,
            })
        );
    }

    #[test]
    fn upsert_updates_existing_entry_in_place() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("b", 3, CompletionUpdate::at(DifficultyTier::Base, 5));
        doc.upsert_completion("b", 3, CompletionUpdate::at(DifficultyTier::Base, 0));

        let character = doc.character("b").unwrap();
        assert_eq!(character.level_completions.len(), 1);
        assert_eq!(character.completed_tier(3, DifficultyTier::Base), 0);
    }

    #[test]
    fn upsert_keeps_difficulties_separate() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("a", 1, CompletionUpdate::at(DifficultyTier::Base, 2));
        doc.upsert_completion("a", 1, CompletionUpdate::at(DifficultyTier::NgPlus, 4));

        let character = doc.character("a").unwrap();
        assert_eq!(character.level_completions.len(), 2);
        assert_eq!(character.completed_tier(1, DifficultyTier::Base), 2);
        assert_eq!(character.completed_tier(1, DifficultyTier::NgPlus), 4);
    }

    #[test]
    fn upsert_clamps_fast_tier() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("a", 1, CompletionUpdate::at(DifficultyTier::Base, 99));
        assert_eq!(doc.character("a").unwrap().completed_tier(1, DifficultyTier::Base), 11);
    }

    #[test]
    fn upsert_unknown_character_is_ignored() {
        let mut doc = ProgressDocument::initial(&catalog());
        let before = doc.clone();
        doc.upsert_completion("ghost", 1, CompletionUpdate::at(DifficultyTier::Base, 3));
        assert_eq!(doc, before);
    }

    #[test]
    fn monotonic_completion_checks() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("a", 2, CompletionUpdate::at(DifficultyTier::Base, 5));

        let character = doc.character("a").unwrap();
        for tier in 1..=5 {
            assert!(character.is_complete_at(2, DifficultyTier::Base, tier));
        }
        assert!(!character.is_complete_at(2, DifficultyTier::Base, 6));
        assert!(!character.is_complete_at(2, DifficultyTier::NgPlus, 1));
        assert!(!character.is_complete_at(2, DifficultyTier::Base, 0));
    }

    #[test]
    fn sorted_breaks_ties_by_catalog_order() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.set_custom_indices(&[
            IndexUpdate::new("a", 1),
            IndexUpdate::new("b", 1),
            IndexUpdate::new("c", 0),
        ]);
        let sorted = doc.sorted_characters(&catalog());
        let order: Vec<&str> = sorted.iter().map(|c| c.character_id.as_str()).collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn normalize_heals_duplicates_and_gaps() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.set_custom_indices(&[
            IndexUpdate::new("a", 5),
            IndexUpdate::new("b", 5),
            IndexUpdate::new("c", 20),
        ]);
        doc.normalize_indices(&catalog());

        let mut indices: Vec<u32> = doc.characters.iter().map(|c| c.custom_index).collect();
        indices.sort();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(doc.character("a").unwrap().custom_index, 0);
        assert_eq!(doc.character("b").unwrap().custom_index, 1);
        assert_eq!(doc.character("c").unwrap().custom_index, 2);
    }

    #[test]
    fn normalize_is_identity_on_well_formed_documents() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.set_custom_indices(&[
            IndexUpdate::new("a", 2),
            IndexUpdate::new("b", 0),
            IndexUpdate::new("c", 1),
        ]);
        let before = doc.clone();
        doc.normalize_indices(&catalog());
        assert_eq!(doc, before);
    }

    #[test]
    fn serde_round_trip() {
        let mut doc = ProgressDocument::initial(&catalog());
        doc.upsert_completion("a", 4, CompletionUpdate::at(DifficultyTier::NgPlus3, 7));
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: ProgressDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}
