//! CommitLog Capability
//!
//! The minimal surface the server needs from a log: append a record and get
//! its offset back, read a record by offset. `streamlog_storage::Log` is
//! the production implementation; [`InMemoryLog`] backs tests that don't
//! care about durability.
//!
//! Implementations are synchronous - the storage engine does blocking file
//! I/O - and the server hops onto the blocking pool around every call.

use parking_lot::RwLock;
use streamlog_core::Record;
use streamlog_storage::{Error, Log, Result};

/// Capability of an ordered, offset-addressed record log
pub trait CommitLog: Send + Sync + 'static {
    /// Append a record, returning the offset it was assigned
    fn append(&self, record: Record) -> Result<u64>;

    /// Read the record at `offset`
    fn read(&self, offset: u64) -> Result<Record>;
}

impl CommitLog for Log {
    fn append(&self, record: Record) -> Result<u64> {
        Log::append(self, record)
    }

    fn read(&self, offset: u64) -> Result<Record> {
        Log::read(self, offset)
    }
}

/// Volatile log for tests: same offset discipline, no files
#[derive(Default)]
pub struct InMemoryLog {
    records: RwLock<Vec<Record>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommitLog for InMemoryLog {
    fn append(&self, mut record: Record) -> Result<u64> {
        let mut records = self.records.write();
        let offset = records.len() as u64;
        record.offset = offset;
        records.push(record);
        Ok(offset)
    }

    fn read(&self, offset: u64) -> Result<Record> {
        let records = self.records.read();
        records
            .get(offset as usize)
            .cloned()
            .ok_or(Error::OffsetOutOfRange(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_in_memory_log_assigns_offsets() {
        let log = InMemoryLog::new();

        assert_eq!(log.append(Record::new(Bytes::from("a"))).unwrap(), 0);
        assert_eq!(log.append(Record::new(Bytes::from("b"))).unwrap(), 1);

        let record = log.read(1).unwrap();
        assert_eq!(record.value, Bytes::from("b"));
        assert_eq!(record.offset, 1);
    }

    #[test]
    fn test_in_memory_log_out_of_range() {
        let log = InMemoryLog::new();
        assert!(matches!(log.read(0), Err(Error::OffsetOutOfRange(0))));
    }
}
