//! Simple, volatile, in-memory implementations of [`KVStore`].

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use topichain::ledger::{KVGet, KVStore, StorageError, WriteBatch};

/// An in-memory implementation of [`KVStore`].
#[derive(Clone)]
pub(crate) struct MemDB(Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>);

impl MemDB {
    /// Create a new, empty `MemDB`.
    pub(crate) fn new() -> MemDB {
        MemDB(Arc::new(Mutex::new(HashMap::new())))
    }
}

impl KVStore for MemDB {
    type WriteBatch = MemWriteBatch;
    type Snapshot<'a> = MemDBSnapshot<'a>;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), StorageError> {
        let mut map = self.0.lock().unwrap();
        for (key, value) in wb.insertions {
            map.insert(key, value);
        }
        Ok(())
    }

    fn snapshot<'b>(&'b self) -> MemDBSnapshot<'b> {
        MemDBSnapshot(self.0.lock().unwrap())
    }
}

impl KVGet for MemDB {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.lock().unwrap().get(key).cloned()
    }
}

// A simple implementation of [`WriteBatch`].
pub(crate) struct MemWriteBatch {
    insertions: HashMap<Vec<u8>, Vec<u8>>,
}

impl WriteBatch for MemWriteBatch {
    fn new() -> Self {
        MemWriteBatch {
            insertions: HashMap::new(),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.insertions.insert(key.to_vec(), value.to_vec());
    }
}

/// A simple implementation of [`KVGet`] used as `KVStore::Snapshot` for `MemDB`.
pub(crate) struct MemDBSnapshot<'a>(MutexGuard<'a, HashMap<Vec<u8>, Vec<u8>>>);

impl KVGet for MemDBSnapshot<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.get(key).cloned()
    }
}

/// A `MemDB` whose writes fail while the fault flag is raised. Reads always succeed.
#[derive(Clone)]
pub(crate) struct FaultyDB {
    db: MemDB,
    failing: Arc<AtomicBool>,
}

impl FaultyDB {
    pub(crate) fn new() -> FaultyDB {
        FaultyDB {
            db: MemDB::new(),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl KVStore for FaultyDB {
    type WriteBatch = MemWriteBatch;
    type Snapshot<'a> = MemDBSnapshot<'a>;

    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError("injected write failure".to_string()));
        }
        self.db.write(wb)
    }

    fn snapshot<'b>(&'b self) -> MemDBSnapshot<'b> {
        self.db.snapshot()
    }
}

impl KVGet for FaultyDB {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key)
    }
}
