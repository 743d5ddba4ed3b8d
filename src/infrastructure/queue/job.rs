//! Type-erased queue entries.

use std::cmp::Ordering;

use futures_util::future::BoxFuture;

use crate::domain::CancellationToken;
use crate::domain::entities::{Priority, RequestId};

/// Deferred work that runs one request to delivery.
pub(super) type JobRunner = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A submitted request waiting for a worker.
///
/// Ordered by priority, then by submission order within a priority.
pub(super) struct QueuedJob {
    pub id: RequestId,
    pub priority: Priority,
    pub token: CancellationToken,
    pub run: JobRunner,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap: earlier ids must compare greater.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::collections::BinaryHeap;

    fn job(id: u64, priority: Priority) -> QueuedJob {
        QueuedJob {
            id: RequestId::new(id),
            priority,
            token: CancellationToken::new(),
            run: Box::new(|| async {}.boxed()),
        }
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(job(1, Priority::Low));
        heap.push(job(2, Priority::Normal));
        heap.push(job(3, Priority::High));
        heap.push(job(4, Priority::Normal));
        heap.push(job(5, Priority::Immediate));

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|job| job.id.get())
            .collect();
        assert_eq!(order, vec![5, 3, 2, 4, 1]);
    }
}
