pub mod debounce;
pub mod lock;

pub use debounce::{DebounceEntry, HazardDebouncer};
pub use lock::{LockState, SwitchCandidate, TargetLock, TrackedTarget};
