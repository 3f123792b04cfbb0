use crate::domain::authorization::DecisionRecord;
use crate::domain::ports::TransactionStore;
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family holding decisions keyed by insertion sequence.
pub const CF_DECISIONS: &str = "decisions";
/// Column Family mapping transaction ids to their sequence number.
pub const CF_DECISION_IDS: &str = "decision_ids";

/// A persistent decision store backed by RocksDB.
///
/// Decisions are stored as JSON under a big-endian sequence number, so a full
/// scan returns them in the order they were saved. A second column family
/// indexes transaction ids to reject duplicates.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    next_seq: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the
    /// sequence after the last stored decision.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_decisions = ColumnFamilyDescriptor::new(CF_DECISIONS, Options::default());
        let cf_ids = ColumnFamilyDescriptor::new(CF_DECISION_IDS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_decisions, cf_ids])?;

        let next_seq = {
            let cf = column_family(&db, CF_DECISIONS)?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_seq(&key)? + 1
                }
                None => 0,
            }
        };

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(AtomicU64::new(next_seq)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| AuthError::StorageError(format!("{name} column family not found")))
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| AuthError::StorageError("Malformed decision key".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn save(&self, record: &DecisionRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let decisions = column_family(&self.db, CF_DECISIONS)?;
        let ids = column_family(&self.db, CF_DECISION_IDS)?;

        let id = record.transaction.transaction_id.as_bytes();
        if self.db.get_pinned_cf(ids, id)?.is_some() {
            return Err(AuthError::StorageError(format!(
                "transaction {} already recorded",
                record.transaction.transaction_id
            )));
        }

        let seq = self.next_seq.load(Ordering::SeqCst).to_be_bytes();
        let value = serde_json::to_vec(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(decisions, seq, value);
        batch.put_cf(ids, id, seq);
        self.db.write(batch)?;
        self.next_seq.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn all(&self) -> Result<Vec<DecisionRecord>> {
        let decisions = column_family(&self.db, CF_DECISIONS)?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(decisions, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }
}
