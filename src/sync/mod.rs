//! Request/response lifecycle for one bound element.
//!
//! A committed mutation emits `stateChange`, then `beforeDebounce`, and
//! re-arms the debounce timer. When the timer fires, `send_update` runs one
//! sync cycle:
//!
//! 1. `beforeUpdate` with the state as of the fire time
//! 2. POST the state plus the reserved partial-name key
//! 3. `beforeRender`, replace the element content verbatim, `afterRender`
//!
//! Any failure replaces step 3 with a single `error` event. Nothing is
//! retried; the next mutation starts an independent cycle. Responses are
//! applied in completion order, so an older request that resolves last wins
//! unless `discard_stale_responses` is enabled.

mod error;
mod partial;

pub use error::SyncError;
pub use partial::{LivePartial, PartialContext};
