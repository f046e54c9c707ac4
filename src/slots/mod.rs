//! Save slots - the durable layout and the one-time legacy migration.
//!
//! Three fixed slots live under their own keys, plus one scalar key naming
//! the active slot. The pre-multi-slot tracker stored a single flat progress
//! document and two scalar preferences; [`SlotStore::migrate_legacy_if_needed`]
//! folds that layout into slot 1 exactly once and never touches it again.
//!
//! Every read degrades to a fresh record rather than failing: corrupt or
//! unreadable save data must never take the UI down with it.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::progress::{clamp_fast_tier, DifficultyTier, ProgressDocument};
use crate::storage::StorageBackend;

/// Number of save slots. Slots are numbered 1 through this value.
pub const MAX_SLOTS: u8 = 3;

pub(crate) const DEFAULT_SLOT: u8 = 1;

// Persisted keys, kept verbatim from the original tracker so existing data
// keeps loading.
const LEGACY_PROGRESS_KEY: &str = "ball-x-pit-progress";
const LEGACY_DIFFICULTY_KEY: &str = "currentDifficulty";
const LEGACY_FAST_TIER_KEY: &str = "currentFastTier";
const ACTIVE_SLOT_KEY: &str = "ball-x-pit-active-slot";

fn slot_key(slot: u8) -> String {
    format!("ball-x-pit-save-{}", slot)
}

/// Whether a slot number is inside the fixed pool.
pub fn is_valid_slot(slot: u8) -> bool {
    (1..=MAX_SLOTS).contains(&slot)
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One durable save slot: the progress document plus slot-scoped navigation
/// state and a display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSlotRecord {
    pub progress: ProgressDocument,
    pub last_difficulty: DifficultyTier,
    pub last_fast_tier: u8,
    pub last_modified: u64,
    pub display_name: String,
}

impl SaveSlotRecord {
    /// A freshly-created slot: empty progress for the current catalog, base
    /// difficulty, and the default `Save {n}` name.
    pub fn fresh(slot: u8, catalog: &Catalog) -> Self {
        SaveSlotRecord {
            progress: ProgressDocument::initial(catalog),
            last_difficulty: DifficultyTier::Base,
            last_fast_tier: 0,
            last_modified: now_millis(),
            display_name: format!("Save {}", slot),
        }
    }
}

/// Translates [`SaveSlotRecord`] to and from durable bytes and owns the
/// legacy migration. All failure modes degrade to defaults and are reported
/// through the log; nothing here is fatal.
#[derive(Clone)]
pub struct SlotStore {
    backend: Arc<dyn StorageBackend>,
    catalog: Catalog,
}

impl SlotStore {
    pub fn new(backend: Arc<dyn StorageBackend>, catalog: Catalog) -> Self {
        SlotStore { backend, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Read a slot, failing over to a fresh record when the key is absent or
    /// the stored bytes do not parse. Reads are reconciled against the
    /// catalog and index-normalized, so a returned record always holds
    /// exactly one well-indexed entry per known character.
    pub fn read_slot(&self, slot: u8) -> SaveSlotRecord {
        let mut record = match self.backend.get(&slot_key(slot)) {
            Ok(Some(raw)) => match serde_json::from_str::<SaveSlotRecord>(&raw) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("save slot {slot} is corrupt, starting fresh: {e}");
                    SaveSlotRecord::fresh(slot, &self.catalog)
                }
            },
            Ok(None) => SaveSlotRecord::fresh(slot, &self.catalog),
            Err(e) => {
                log::warn!("failed to read save slot {slot}, starting fresh: {e}");
                SaveSlotRecord::fresh(slot, &self.catalog)
            }
        };

        record.progress.reconcile_with_catalog(&self.catalog);
        record.progress.normalize_indices(&self.catalog);
        record.last_fast_tier = clamp_fast_tier(record.last_fast_tier);
        record
    }

    /// Persist a slot, stamping `last_modified` with the write time. Returns
    /// the stamped record so callers can mirror it in memory. A storage
    /// failure loses durability for this write only; the stamped record is
    /// still returned and the failure is logged.
    pub fn write_slot(&self, slot: u8, record: &SaveSlotRecord) -> SaveSlotRecord {
        let mut stamped = record.clone();
        stamped.last_modified = now_millis();

        match serde_json::to_string(&stamped) {
            Ok(raw) => {
                if let Err(e) = self.backend.set(&slot_key(slot), &raw) {
                    log::warn!("failed to persist save slot {slot}: {e}");
                }
            }
            Err(e) => log::warn!("failed to serialize save slot {slot}: {e}"),
        }

        stamped
    }

    /// The persisted active-slot pointer, defaulting to slot 1 when absent,
    /// unparsable, or out of range.
    pub fn read_active_slot(&self) -> u8 {
        match self.backend.get(ACTIVE_SLOT_KEY) {
            Ok(Some(raw)) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|slot| is_valid_slot(*slot))
                .unwrap_or(DEFAULT_SLOT),
            Ok(None) => DEFAULT_SLOT,
            Err(e) => {
                log::warn!("failed to read active slot pointer: {e}");
                DEFAULT_SLOT
            }
        }
    }

    pub fn write_active_slot(&self, slot: u8) {
        if let Err(e) = self.backend.set(ACTIVE_SLOT_KEY, &slot.to_string()) {
            log::warn!("failed to persist active slot pointer: {e}");
        }
    }

    /// Fold the pre-multi-slot layout into slot 1, once.
    ///
    /// Runs only when slot 1 does not exist and the legacy document does;
    /// once slot 1 exists this is a no-op forever, so user edits made after
    /// migration are never clobbered. Legacy keys are left in place.
    pub fn migrate_legacy_if_needed(&self) {
        match self.backend.get(&slot_key(DEFAULT_SLOT)) {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                log::warn!("failed to check for existing save slot, skipping migration: {e}");
                return;
            }
        }

        let raw = match self.backend.get(LEGACY_PROGRESS_KEY) {
            Ok(Some(raw)) => raw,
            _ => return,
        };
        let progress = match serde_json::from_str::<ProgressDocument>(&raw) {
            Ok(progress) => progress,
            Err(e) => {
                log::warn!("legacy progress data is corrupt, skipping migration: {e}");
                return;
            }
        };

        let last_difficulty = self
            .backend
            .get(LEGACY_DIFFICULTY_KEY)
            .ok()
            .flatten()
            .and_then(|raw| DifficultyTier::from_str(raw.trim()).ok())
            .unwrap_or_default();
        let last_fast_tier = self
            .backend
            .get(LEGACY_FAST_TIER_KEY)
            .ok()
            .flatten()
            .and_then(|raw| raw.trim().parse::<u8>().ok())
            .map(clamp_fast_tier)
            .unwrap_or(0);

        let record = SaveSlotRecord {
            progress,
            last_difficulty,
            last_fast_tier,
            last_modified: now_millis(),
            display_name: format!("Save {}", DEFAULT_SLOT),
        };

        self.write_slot(DEFAULT_SLOT, &record);
        self.write_active_slot(DEFAULT_SLOT);
        log::info!("migrated legacy progress data into save slot 1");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn store() -> (MemoryBackend, SlotStore) {
        let backend = MemoryBackend::new();
        let slots = SlotStore::new(
            Arc::new(backend.clone()),
            Catalog::new(["a", "b", "c"]),
        );
        (backend, slots)
    }

    #[test]
    fn read_absent_slot_is_fresh() {
        let (_, slots) = store();
        let record = slots.read_slot(2);
        assert_eq!(record.display_name, "Save 2");
        assert_eq!(record.last_difficulty, DifficultyTier::Base);
        assert_eq!(record.progress.characters.len(), 3);
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_, slots) = store();
        let mut record = SaveSlotRecord::fresh(1, slots.catalog());
        record.last_difficulty = DifficultyTier::NgPlus2;
        record.last_fast_tier = 4;
        record.display_name = "My run".to_string();

        let stamped = slots.write_slot(1, &record);
        let read = slots.read_slot(1);
        assert_eq!(read, stamped);
        assert_eq!(read.display_name, "My run");
        assert_eq!(read.last_difficulty, DifficultyTier::NgPlus2);
    }

    #[test]
    fn corrupt_slot_reads_as_fresh() {
        let (backend, slots) = store();
        backend.set("ball-x-pit-save-1", "{ not json").unwrap();
        let record = slots.read_slot(1);
        assert_eq!(record.display_name, "Save 1");
        assert!(record.progress.characters.iter().all(|c| c.level_completions.is_empty()));
    }

    #[test]
    fn read_reconciles_against_grown_catalog() {
        let backend = MemoryBackend::new();
        let old = SlotStore::new(Arc::new(backend.clone()), Catalog::new(["a", "b"]));
        old.write_slot(1, &SaveSlotRecord::fresh(1, old.catalog()));

        let new = SlotStore::new(Arc::new(backend), Catalog::new(["a", "b", "c"]));
        let record = new.read_slot(1);
        assert_eq!(record.progress.characters.len(), 3);
        assert_eq!(record.progress.character("c").unwrap().custom_index, 2);
    }

    #[test]
    fn active_slot_defaults_and_validates() {
        let (backend, slots) = store();
        assert_eq!(slots.read_active_slot(), 1);

        backend.set("ball-x-pit-active-slot", "2").unwrap();
        assert_eq!(slots.read_active_slot(), 2);

        backend.set("ball-x-pit-active-slot", "9").unwrap();
        assert_eq!(slots.read_active_slot(), 1);

        backend.set("ball-x-pit-active-slot", "junk").unwrap();
        assert_eq!(slots.read_active_slot(), 1);
    }

    #[test]
    fn migration_builds_slot_1_from_legacy_keys() {
        let (backend, slots) = store();
        let legacy = ProgressDocument::initial(slots.catalog());
        backend
            .set("ball-x-pit-progress", &serde_json::to_string(&legacy).unwrap())
            .unwrap();
        backend.set("currentDifficulty", "ng-plus-3").unwrap();
        backend.set("currentFastTier", "6").unwrap();

        slots.migrate_legacy_if_needed();

        let record = slots.read_slot(1);
        assert_eq!(record.last_difficulty, DifficultyTier::NgPlus3);
        assert_eq!(record.last_fast_tier, 6);
        assert_eq!(record.display_name, "Save 1");
        assert_eq!(slots.read_active_slot(), 1);
        // legacy keys stay put
        assert!(backend.get("ball-x-pit-progress").unwrap().is_some());
    }

    #[test]
    fn migration_defaults_malformed_scalars() {
        let (backend, slots) = store();
        let legacy = ProgressDocument::initial(slots.catalog());
        backend
            .set("ball-x-pit-progress", &serde_json::to_string(&legacy).unwrap())
            .unwrap();
        backend.set("currentDifficulty", "nightmare").unwrap();
        backend.set("currentFastTier", "999").unwrap();

        slots.migrate_legacy_if_needed();

        let record = slots.read_slot(1);
        assert_eq!(record.last_difficulty, DifficultyTier::Base);
        assert_eq!(record.last_fast_tier, 0);
    }

    #[test]
    fn migration_without_legacy_data_does_nothing() {
        let (backend, slots) = store();
        slots.migrate_legacy_if_needed();
        assert!(backend.get("ball-x-pit-save-1").unwrap().is_none());
    }

    #[test]
    fn migration_never_clobbers_existing_slot_1() {
        let (backend, slots) = store();
        let mut record = SaveSlotRecord::fresh(1, slots.catalog());
        record.display_name = "Edited after migration".to_string();
        slots.write_slot(1, &record);

        let legacy = ProgressDocument::initial(slots.catalog());
        backend
            .set("ball-x-pit-progress", &serde_json::to_string(&legacy).unwrap())
            .unwrap();

        slots.migrate_legacy_if_needed();
        assert_eq!(slots.read_slot(1).display_name, "Edited after migration");
    }

    #[test]
    fn migration_is_idempotent() {
        let (backend, slots) = store();
        let legacy = ProgressDocument::initial(slots.catalog());
        backend
            .set("ball-x-pit-progress", &serde_json::to_string(&legacy).unwrap())
            .unwrap();

        slots.migrate_legacy_if_needed();
        let first = slots.read_slot(1);
        slots.migrate_legacy_if_needed();
        assert_eq!(slots.read_slot(1), first);
    }

    #[test]
    fn corrupt_legacy_document_aborts_migration() {
        let (backend, slots) = store();
        backend.set("ball-x-pit-progress", "not json at all").unwrap();
        slots.migrate_legacy_if_needed();
        assert!(backend.get("ball-x-pit-save-1").unwrap().is_none());
    }

    #[test]
    fn slot_bounds() {
        assert!(!is_valid_slot(0));
        assert!(is_valid_slot(1));
        assert!(is_valid_slot(3));
        assert!(!is_valid_slot(4));
    }
}
