//! Pending queue of records awaiting sealing.

use crate::ledger::record::{AuditRecord, RecordId};
use std::collections::VecDeque;

/// FIFO buffer of submitted records.
#[derive(Debug, Default)]
pub struct PendingQueue {
    records: VecDeque<AuditRecord>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly submitted record.
    pub fn push_back(&mut self, record: AuditRecord) {
        self.records.push_back(record);
    }

    /// Remove up to `max` records from the front, oldest first.
    pub fn drain_front(&mut self, max: usize) -> Vec<AuditRecord> {
        let take = max.min(self.records.len());
        self.records.drain(..take).collect()
    }

    /// Return a batch to the front, keeping its original order ahead of
    /// anything submitted since it was drained.
    pub fn requeue_front(&mut self, batch: Vec<AuditRecord>) {
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find a queued record by id.
    pub fn find(&self, id: &RecordId) -> Option<&AuditRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::record::{AuditAction, Executive};

    fn record(n: usize) -> AuditRecord {
        let exec = Executive::new("exec-1", "Ada Chief");
        AuditRecord::new(&exec, &AuditAction::new("op", &n.to_string()), None)
    }

    fn descriptions(queue: &PendingQueue) -> Vec<String> {
        queue.iter().map(|r| r.description.clone()).collect()
    }

    #[test]
    fn test_drain_front_fifo() {
        let mut queue = PendingQueue::new();
        for i in 0..5 {
            queue.push_back(record(i));
        }

        let batch = queue.drain_front(3);
        let drained: Vec<_> = batch.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(drained, vec!["0", "1", "2"]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_more_than_available() {
        let mut queue = PendingQueue::new();
        queue.push_back(record(0));
        assert_eq!(queue.drain_front(10).len(), 1);
        assert!(queue.is_empty());
        assert!(queue.drain_front(10).is_empty());
    }

    #[test]
    fn test_requeue_front_preserves_order() {
        let mut queue = PendingQueue::new();
        for i in 0..4 {
            queue.push_back(record(i));
        }
        let batch = queue.drain_front(2);
        queue.push_back(record(4));
        queue.requeue_front(batch);

        assert_eq!(descriptions(&queue), vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_find() {
        let mut queue = PendingQueue::new();
        let r = record(7);
        let id = r.id.clone();
        queue.push_back(r);
        assert!(queue.find(&id).is_some());
        assert!(queue.find(&RecordId::new("nope")).is_none());
    }
}
