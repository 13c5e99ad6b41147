//! Visit notification requests.

use super::{Request, RequestFlags, RequestId, RequestKind};
use crate::model::Visit;

/// Handler invoked with each recorded visit.
pub type VisitHandler = Box<dyn Fn(&Visit) + Send + Sync>;

/// A caller's interest in visit notifications.
///
/// Visits have no accuracy or frequency axis; registration force-enables the
/// request and hardware monitoring is a plain on/off toggle.
pub struct VisitRequest {
    id: RequestId,
    flags: RequestFlags,
    on_visit: VisitHandler,
}

impl VisitRequest {
    /// Create a request with a fresh identifier.
    pub fn new<V>(on_visit: V) -> Self
    where
        V: Fn(&Visit) + Send + Sync + 'static,
    {
        Self {
            id: RequestId::next(),
            flags: RequestFlags::new(),
            on_visit: Box::new(on_visit),
        }
    }

    pub(crate) fn deliver(&self, visit: &Visit) {
        (self.on_visit)(visit);
    }
}

impl Request for VisitRequest {
    const ENABLE_ON_REGISTER: bool = true;
    const KIND: RequestKind = RequestKind::Visit;

    fn id(&self) -> RequestId {
        self.id
    }

    fn flags(&self) -> &RequestFlags {
        &self.flags
    }
}

impl std::fmt::Debug for VisitRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitRequest")
            .field("id", &self.id)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
