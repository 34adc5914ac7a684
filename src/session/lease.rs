//! Exclusive right to edit one document.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::id::DocumentId;

/// Held by the one open session of a document; released on drop.
#[derive(Debug)]
pub struct SessionLease {
    document_id: DocumentId,
    flag: Arc<AtomicBool>,
}

impl SessionLease {
    /// Take the lease guarded by `flag`, or `None` when it is already held.
    pub(crate) fn acquire(document_id: DocumentId, flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                document_id,
                flag: Arc::clone(flag),
            })
    }

    #[inline]
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
