pub mod config;
pub mod conflict;
pub mod entry;
pub(crate) mod entry_validation;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod overlap;
pub mod persistence;
pub mod reference;
pub mod registry;
pub mod service;
#[cfg(any(feature = "http_api", feature = "cli_api"))]
pub mod telemetry;

pub use config::{ConfigError, ServerConfig, StoreLocation};
pub use conflict::ConflictDetector;
pub use entry::{
    ClassId, ClassroomId, DayOfWeek, EntryId, ScheduleEntry, ScheduleFilter, ScheduleListing,
    ScheduleRequest, ScheduleSlot, TeacherId,
};
pub use entry_validation::validate_request;
pub use error::{ConflictKind, Resource, ScheduleError, ScheduleResult, ValidationError};
pub use overlap::overlaps;
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteScheduleStore;
pub use persistence::{
    ExportError, MemoryScheduleStore, ScheduleQueries, ScheduleStore, ScheduleTransaction,
    StoreError, StoreResult, load_listings_from_json, save_listings_to_csv, save_listings_to_json,
    write_listings_csv,
};
pub use reference::ReferenceValidator;
pub use registry::{ClassOffering, ClassRegistry, Classroom, ClassroomRegistry, Teacher};
pub use service::{RequestPhase, ScheduleService};
