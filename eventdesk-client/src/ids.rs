use eventdesk_common::domain::RecordId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of ids for records created while the server is unreachable.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RecordId;
}

/// Time ordered UUID v7 ids. Unique even when records are created in quick succession.
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> RecordId {
        RecordId::generate()
    }
}

/// "{prefix}{n}" with n counting up from 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> RecordId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RecordId::new(format!("{}{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_do_not_collide() {
        let ids = UuidIds;
        let set: HashSet<_> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(set.len(), 1000);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("local-");
        assert_eq!(ids.next_id().as_str(), "local-1");
        assert_eq!(ids.next_id().as_str(), "local-2");
    }
}
