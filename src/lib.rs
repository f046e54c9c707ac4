mod bus;
mod catalog;
mod progress;
mod slots;
mod storage;
mod store;

pub use bus::{SubscriptionId, UpdateBus};
pub use catalog::{Catalog, CharacterRef};
pub use progress::{
    clamp_fast_tier, fast_tier_label, toggle_fast_tier, CharacterProgress, CompletionUpdate,
    DifficultyTier, IndexUpdate, LevelCompletion, ProgressDocument, UnknownDifficulty,
    MAX_FAST_TIER, SCHEMA_VERSION,
};
pub use slots::{is_valid_slot, SaveSlotRecord, SlotStore, MAX_SLOTS};
pub use storage::{FileBackend, MemoryBackend, StorageBackend, StorageError};
pub use store::{ProgressStore, SlotSummary};
