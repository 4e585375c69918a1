//! Runtime integration layer.
//!
//! Isolates worker thread and runtime boundaries so async/threading behavior
//! remains localized and predictable for the rest of the crate. The outbound
//! pipeline worker and each correlation sweeper own one dedicated thread.

pub(crate) mod worker_runtime;
