//! Store facade - the single entry point views interact with.
//!
//! One [`ProgressStore`] is constructed at application start and shared
//! (`Arc`) by every view. It holds the live record of the active slot in
//! memory, mirrors every mutation to the durable layer, and broadcasts on
//! the update bus so all mounted views re-pull. Views never mutate state
//! directly; with no concurrent writers, "reload and re-render on notify"
//! is safe.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::bus::{SubscriptionId, UpdateBus};
use crate::catalog::Catalog;
use crate::progress::{
    clamp_fast_tier, CharacterProgress, CompletionUpdate, DifficultyTier, IndexUpdate,
    ProgressDocument,
};
use crate::slots::{is_valid_slot, now_millis, SaveSlotRecord, SlotStore, MAX_SLOTS};
use crate::storage::StorageBackend;

/// A slot number paired with a read-only snapshot of its record, for the
/// save-slot picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSummary {
    pub slot: u8,
    pub record: SaveSlotRecord,
}

struct ActiveState {
    slot: u8,
    record: SaveSlotRecord,
}

/// The progress store: composes the slot store, the progress model, and the
/// update bus behind one imperative surface.
///
/// Every mutating operation runs synchronously: mutate the in-memory record,
/// persist it, then broadcast. The caller sees authoritative state as soon
/// as the call returns; the broadcast exists for the *other* views. Storage
/// failures degrade to memory-only and never surface here.
pub struct ProgressStore {
    catalog: Catalog,
    slots: SlotStore,
    bus: UpdateBus,
    state: RwLock<ActiveState>,
}

impl ProgressStore {
    /// Open the store: run the one-time legacy migration, then load whichever
    /// slot the persisted pointer names.
    pub fn open(backend: Arc<dyn StorageBackend>, catalog: Catalog) -> Self {
        let slots = SlotStore::new(backend, catalog.clone());
        slots.migrate_legacy_if_needed();

        let slot = slots.read_active_slot();
        let record = slots.read_slot(slot);

        ProgressStore {
            catalog,
            slots,
            bus: UpdateBus::new(),
            state: RwLock::new(ActiveState { slot, record }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ActiveState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ActiveState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mutate the active record, persist it, and broadcast. The state lock is
    /// released before publishing so subscribers can re-pull freely.
    fn mutate_record<F>(&self, mutate: F)
    where
        F: FnOnce(&mut SaveSlotRecord),
    {
        {
            let mut state = self.write_state();
            mutate(&mut state.record);
            let stamped = self.slots.write_slot(state.slot, &state.record);
            state.record = stamped;
        }
        self.bus.publish();
    }

    /// Like [`Self::mutate_record`] for changes to the progress document;
    /// also stamps the document's own update time.
    fn mutate_progress<F>(&self, mutate: F)
    where
        F: FnOnce(&mut ProgressDocument),
    {
        self.mutate_record(|record| {
            mutate(&mut record.progress);
            record.progress.last_updated = now_millis();
        });
    }

    // --- reads ---------------------------------------------------------

    /// All characters in display order: `custom_index` ascending, ties
    /// broken by catalog order.
    pub fn sorted_characters(&self) -> Vec<CharacterProgress> {
        self.read_state().record.progress.sorted_characters(&self.catalog)
    }

    pub fn character_progress(&self, character_id: &str) -> Option<CharacterProgress> {
        self.read_state()
            .record
            .progress
            .character(character_id)
            .cloned()
    }

    pub fn active_slot(&self) -> u8 {
        self.read_state().slot
    }

    /// Snapshot of the active slot's full record.
    pub fn active_record(&self) -> SaveSlotRecord {
        self.read_state().record.clone()
    }

    pub fn active_difficulty(&self) -> DifficultyTier {
        self.read_state().record.last_difficulty
    }

    pub fn active_fast_tier(&self) -> u8 {
        self.read_state().record.last_fast_tier
    }

    pub fn display_name(&self) -> String {
        self.read_state().record.display_name.clone()
    }

    /// Read-only snapshot of every slot, active one included. Does not
    /// change the active slot. The active slot reflects the in-memory
    /// record, which is authoritative when a durable write has failed.
    pub fn slots(&self) -> Vec<SlotSummary> {
        let (active_slot, active_record) = {
            let state = self.read_state();
            (state.slot, state.record.clone())
        };

        (1..=MAX_SLOTS)
            .map(|slot| SlotSummary {
                slot,
                record: if slot == active_slot {
                    active_record.clone()
                } else {
                    self.slots.read_slot(slot)
                },
            })
            .collect()
    }

    // --- mutations -----------------------------------------------------

    /// Apply a batch of index assignments, e.g. the full ordering a
    /// drag-and-drop pass produced. Partial batches leave other characters'
    /// indices untouched; unknown ids are skipped.
    pub fn reorder_characters(&self, updates: &[IndexUpdate]) {
        self.mutate_progress(|progress| progress.set_custom_indices(updates));
    }

    /// Move a single character to a new index.
    pub fn reorder_character(&self, character_id: &str, custom_index: u32) {
        self.reorder_characters(&[IndexUpdate::new(character_id, custom_index)]);
    }

    /// Record (or overwrite) a level completion for one character. Callers
    /// decide the new fast tier; see
    /// [`toggle_fast_tier`](crate::progress::toggle_fast_tier) for the
    /// recommended toggle policy.
    pub fn record_level_completion(
        &self,
        character_id: &str,
        level_id: u32,
        update: CompletionUpdate,
    ) {
        self.mutate_progress(|progress| {
            progress.upsert_completion(character_id, level_id, update)
        });
    }

    /// Persist the last-viewed difficulty so it survives a reload.
    pub fn set_active_difficulty(&self, difficulty: DifficultyTier) {
        self.mutate_record(|record| record.last_difficulty = difficulty);
    }

    /// Persist the last-viewed fast tier, clamped to the valid range.
    pub fn set_active_fast_tier(&self, fast_tier: u8) {
        self.mutate_record(|record| record.last_fast_tier = clamp_fast_tier(fast_tier));
    }

    /// Rename the active slot.
    pub fn rename_slot(&self, display_name: impl Into<String>) {
        let display_name = display_name.into();
        self.mutate_record(|record| record.display_name = display_name);
    }

    /// Switch to another slot: persist the pointer, reload that slot's
    /// record into memory, broadcast. Slots never merge. Out-of-range slot
    /// numbers are a no-op.
    pub fn switch_slot(&self, slot: u8) {
        if !is_valid_slot(slot) {
            return;
        }

        self.slots.write_active_slot(slot);
        let record = self.slots.read_slot(slot);
        {
            let mut state = self.write_state();
            state.slot = slot;
            state.record = record;
        }
        self.bus.publish();
    }

    /// Reset a slot to a fresh record. Resetting the active slot refreshes
    /// the in-memory state and broadcasts immediately.
    pub fn delete_slot(&self, slot: u8) {
        if !is_valid_slot(slot) {
            return;
        }

        let fresh = SaveSlotRecord::fresh(slot, &self.catalog);
        let stamped = self.slots.write_slot(slot, &fresh);

        let is_active = {
            let mut state = self.write_state();
            if state.slot == slot {
                state.record = stamped;
                true
            } else {
                false
            }
        };
        if is_active {
            self.bus.publish();
        }
    }

    /// Wipe the active slot's progress (orderings and completions) while
    /// keeping its display name and navigation state.
    pub fn reset_progress(&self) {
        self.mutate_record(|record| {
            record.progress = ProgressDocument::initial(&self.catalog);
        });
    }

    // --- subscriptions -------------------------------------------------

    /// Attach a callback invoked after every broadcast. Observers re-pull
    /// state through the getters; broadcasts carry no payload.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: &SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    /// Arm the one-shot echo guard for a subscriber about to issue its own
    /// write; that subscriber skips exactly the next broadcast.
    pub fn suppress_next(&self, id: &SubscriptionId) {
        self.bus.suppress_next(id);
    }
}
