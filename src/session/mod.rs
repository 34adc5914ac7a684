//! Edit sessions.
//!
//! A session is the unit of atomicity for a run: it owns the working copy of
//! the document, the base snapshot used for rollback, the log of every
//! attempted operation and the lease that keeps other sessions away from the
//! same document.

mod edit_session;
mod lease;
mod log;

pub use edit_session::{EditSession, SessionOutcome, SessionStatus};
pub use lease::SessionLease;
pub use log::{AttemptOutcome, EditHistory, LogEntry, OperationLog, Origin};
