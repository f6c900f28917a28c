//! Key-addressed record persistence with backup-before-write
//!
//! Every collection lives in its own sled tree. Writing a record first copies
//! the previous value into the collection's `.bak` tree; both inserts happen in
//! one multi-tree transaction so a failed write leaves the prior record intact.
//! A write whose flush fails is rolled back the same way.
use super::error::{Error, Result, StoreError};
use sled::Transactional;
use sled::transaction::{TransactionError, TransactionResult};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Hotels,
    Bookings,
    Users,
    RoomTypes,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Hotels => "hotels",
            Collection::Bookings => "bookings",
            Collection::Users => "users",
            Collection::RoomTypes => "room_types",
        }
    }
    pub fn backup_name(&self) -> &'static str {
        match self {
            Collection::Hotels => "hotels.bak",
            Collection::Bookings => "bookings.bak",
            Collection::Users => "users.bak",
            Collection::RoomTypes => "room_types.bak",
        }
    }
}

/// A record that can be stored under its id in a fixed collection.
pub trait Record: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

pub trait RecordStore: Send + Sync {
    fn find<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError>;

    fn list<R: Record>(&self) -> Result<Vec<R>, StoreError>;

    /// Snapshot the current record (if any) into the backup area, then write.
    fn put<R: Record>(&self, record: &R) -> Result<(), StoreError>;

    fn backup_of<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError>;

    fn get<R: Record>(&self, id: &str) -> Result<R> {
        self.find(id)?.ok_or_else(|| Error::NotFound {
            collection: R::COLLECTION.name(),
            id: id.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct SledStore {
    instance: Arc<sled::Db>,
    flush_on_write: bool,
}

impl SledStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            instance,
            flush_on_write: true,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self::new(Arc::new(db)))
    }

    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    fn tree(&self, name: &'static str) -> Result<sled::Tree, StoreError> {
        Ok(self.instance.open_tree(name)?)
    }

    /// Back up the current value and write `bytes` in one transaction.
    fn write(&self, collection: Collection, id: &str, bytes: &[u8]) -> Result<Snapshot, StoreError> {
        let records = self.tree(collection.name())?;
        let backups = self.tree(collection.backup_name())?;

        let outcome: TransactionResult<Snapshot> = (&records, &backups).transaction(|(records, backups)| {
            let snapshot = Snapshot {
                record: records.get(id.as_bytes())?,
                backup: backups.get(id.as_bytes())?,
            };
            if let Some(previous) = &snapshot.record {
                backups.insert(id.as_bytes(), previous.clone())?;
            }
            records.insert(id.as_bytes(), bytes)?;
            Ok(snapshot)
        });
        outcome.map_err(|e| aborted(collection, id, e))
    }

    /// Put both trees back to `snapshot`.
    fn restore(&self, collection: Collection, id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let records = self.tree(collection.name())?;
        let backups = self.tree(collection.backup_name())?;

        let outcome: TransactionResult<()> = (&records, &backups).transaction(|(records, backups)| {
            match &snapshot.record {
                Some(value) => records.insert(id.as_bytes(), value.clone())?,
                None => records.remove(id.as_bytes())?,
            };
            match &snapshot.backup {
                Some(value) => backups.insert(id.as_bytes(), value.clone())?,
                None => backups.remove(id.as_bytes())?,
            };
            Ok(())
        });
        outcome.map_err(|e| aborted(collection, id, e))
    }

    /// A write only counts once it is durable. When the flush failed, the
    /// committed write is rolled back so the prior record stays authoritative.
    fn settle(
        &self,
        collection: Collection,
        id: &str,
        snapshot: Snapshot,
        flushed: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let Err(e) = flushed else {
            return Ok(());
        };

        tracing::error!(collection = collection.name(), id, error = %e, "flush failed, rolling back write");
        if let Err(rollback) = self.restore(collection, id, &snapshot) {
            tracing::error!(collection = collection.name(), id, error = %rollback, "rollback failed");
        }
        Err(e)
    }
}

/// What one key held in a collection and its backup tree before a write.
#[derive(Debug, Clone)]
struct Snapshot {
    record: Option<sled::IVec>,
    backup: Option<sled::IVec>,
}

fn aborted(collection: Collection, id: &str, e: TransactionError<()>) -> StoreError {
    match e {
        TransactionError::Abort(()) => StoreError::Aborted {
            collection: collection.name(),
            id: id.to_string(),
        },
        TransactionError::Storage(e) => StoreError::Sled(e),
    }
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R, StoreError> {
    minicbor::decode(bytes).map_err(|source| StoreError::Decode {
        collection: R::COLLECTION.name(),
        source,
    })
}

impl RecordStore for SledStore {
    fn find<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let tree = self.tree(R::COLLECTION.name())?;
        tree.get(id.as_bytes())?
            .map(|bytes| decode::<R>(&bytes))
            .transpose()
    }

    fn list<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let tree = self.tree(R::COLLECTION.name())?;
        let mut records = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_, bytes) = item?;
            records.push(decode::<R>(&bytes)?);
        }
        Ok(records)
    }

    fn put<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let collection = R::COLLECTION;
        let id = record.id();
        let bytes = minicbor::to_vec(record).map_err(|e| StoreError::Encode(e.to_string()))?;

        let snapshot = self.write(collection, id, &bytes)?;
        let flushed = if self.flush_on_write {
            self.instance.flush().map(drop).map_err(StoreError::from)
        } else {
            Ok(())
        };
        self.settle(collection, id, snapshot, flushed)?;

        tracing::debug!(collection = collection.name(), id, "record written");
        Ok(())
    }

    fn backup_of<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let tree = self.tree(R::COLLECTION.backup_name())?;
        tree.get(id.as_bytes())?
            .map(|bytes| decode::<R>(&bytes))
            .transpose()
    }
}
