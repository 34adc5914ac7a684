//! A document shared between callers and runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::common::error::{Error, Result};
use crate::common::id::DocumentId;
use crate::session::SessionLease;

use super::model::Document;

/// Cloneable handle to a document and its session lease.
///
/// At most one edit session can hold the lease at a time. Readers never wait
/// on a session: the lock is only taken for snapshots and for the final
/// commit, never across an await point.
#[derive(Debug, Clone)]
pub struct SharedDocument {
    id: DocumentId,
    inner: Arc<RwLock<Document>>,
    leased: Arc<AtomicBool>,
}

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self {
            id: document.id(),
            inner: Arc::new(RwLock::new(document)),
            leased: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// A copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.inner.read().clone()
    }

    /// Run `f` against the current document.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn to_markup(&self) -> String {
        self.inner.read().to_markup()
    }

    /// Whether an edit session currently holds the lease.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.leased.load(Ordering::Acquire)
    }

    /// Take the session lease, failing with `SessionBusy` when it is held.
    pub fn try_begin_session(&self) -> Result<SessionLease> {
        SessionLease::acquire(self.id, &self.leased).ok_or(Error::SessionBusy(self.id))
    }

    /// Replace the document; only the lease holder can do this.
    pub(crate) fn replace(&self, lease: &SessionLease, document: Document) -> Result<()> {
        if lease.document_id() != self.id || !self.is_busy() {
            return Err(Error::SessionBusy(self.id));
        }
        *self.inner.write() = document;
        Ok(())
    }
}
