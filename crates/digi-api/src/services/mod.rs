//! Business logic services.

pub mod autosave;
pub mod lifecycle;
pub mod progress;
pub mod store;

pub use autosave::AutosaveScheduler;
pub use lifecycle::{
    LifecycleError, LifecycleResult, LifecycleService, SessionStart, StepAdvance, Submission,
};
pub use progress::ProgressService;
pub use store::{ApplicationStore, DraftStore, FirestoreStore, StoreError, StoreResult};
