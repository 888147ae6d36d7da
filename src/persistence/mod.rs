use crate::entry::{
    ClassroomId, DayOfWeek, EntryId, ScheduleEntry, ScheduleFilter, ScheduleListing, ScheduleSlot,
    TeacherId,
};
use crate::error::{ConflictKind, ScheduleResult};
use crate::registry::{ClassRegistry, ClassroomRegistry};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not take its lock in time. Safe to retry for reads.
    #[error("store busy: {0}")]
    Busy(String),
    /// A store-level exclusion rule rejected the write.
    #[error("{0} exclusion rule rejected the write")]
    Exclusion(ConflictKind),
    /// A constraint other than the exclusion rules failed.
    #[error("constraint violated: {0}")]
    Constraint(String),
    /// A stored row cannot be turned back into a valid record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Schedule lookups the conflict detector runs against.
pub trait ScheduleQueries {
    fn find_entry(&self, id: EntryId) -> StoreResult<Option<ScheduleEntry>>;
    fn entries_for_classroom(
        &self,
        classroom_id: ClassroomId,
        day_of_week: DayOfWeek,
    ) -> StoreResult<Vec<ScheduleEntry>>;
    /// Entries whose class is taught by `teacher_id` on `day_of_week`.
    fn entries_for_teacher(
        &self,
        teacher_id: TeacherId,
        day_of_week: DayOfWeek,
    ) -> StoreResult<Vec<ScheduleEntry>>;
}

/// One unit of work against the store. Reads observe the same snapshot the
/// write commits against; nothing is visible to other callers until the
/// owning [`ScheduleStore::write_atomically`] call returns `Ok`.
pub trait ScheduleTransaction: ScheduleQueries + ClassRegistry + ClassroomRegistry {
    fn insert_entry(&mut self, slot: &ScheduleSlot) -> StoreResult<ScheduleEntry>;
    /// Overwrites every field but the id. `Ok(None)` when `id` is unknown.
    fn replace_entry(
        &mut self,
        id: EntryId,
        slot: &ScheduleSlot,
    ) -> StoreResult<Option<ScheduleEntry>>;
}

pub type TransactionWork<'w> =
    dyn FnMut(&mut dyn ScheduleTransaction) -> ScheduleResult<ScheduleEntry> + 'w;

pub trait ScheduleStore: Send + Sync {
    /// Runs `work` in one serialized transaction. A returned error discards
    /// every change `work` made.
    fn write_atomically(&self, work: &mut TransactionWork<'_>) -> ScheduleResult<ScheduleEntry>;
    fn find_listing(&self, id: EntryId) -> StoreResult<Option<ScheduleListing>>;
    /// Listings ordered by day, start time and id.
    fn list_listings(&self, filter: &ScheduleFilter) -> StoreResult<Vec<ScheduleListing>>;
    fn delete_entry(&self, id: EntryId) -> StoreResult<bool>;
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ExportError, load_listings_from_json, save_listings_to_csv, save_listings_to_json,
    write_listings_csv,
};
pub use memory::MemoryScheduleStore;
