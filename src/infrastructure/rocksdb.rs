use crate::domain::account::{BalanceAdjustment, ReferralAccount, ReferralEarning};
use crate::domain::payout::{PayoutId, PayoutRequest, PayoutStatus};
use crate::domain::ports::{PayoutStore, ReferralStore};
use crate::domain::query::{Page, PayoutQuery};
use crate::error::{PayoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payout requests, keyed by the 16 UUID bytes.
pub const CF_PAYOUTS: &str = "payouts";
/// Column Family for referral accounts, keyed by owner id.
pub const CF_REFERRAL_ACCOUNTS: &str = "referral_accounts";
/// Column Family for referral earnings, keyed by order id.
pub const CF_REFERRAL_EARNINGS: &str = "referral_earnings";

/// A persistent store implementation using RocksDB.
///
/// Backs both `PayoutStore` and `ReferralStore` using separate Column Families with JSON
/// values. Read-modify-write sequences (conditional payout updates, ledger adjustments)
/// run under a shared writer lock.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_PAYOUTS, CF_REFERRAL_ACCOUNTS, CF_REFERRAL_EARNINGS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PayoutError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_pinned_cf(handle, key)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        self.db.put_cf(handle, key, encode(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        PayoutError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        PayoutError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl PayoutStore for RocksDBStore {
    async fn insert(&self, payout: PayoutRequest) -> Result<()> {
        let _guard = self.writer.lock().await;
        let key = payout.id.as_bytes();
        if self.read::<PayoutRequest>(CF_PAYOUTS, key)?.is_some() {
            return Err(PayoutError::ValidationError(format!(
                "Payout {} already exists",
                payout.id
            )));
        }
        self.write(CF_PAYOUTS, key, &payout)
    }

    async fn get(&self, id: PayoutId) -> Result<Option<PayoutRequest>> {
        self.read(CF_PAYOUTS, id.as_bytes())
    }

    async fn update(&self, payout: PayoutRequest, expected: PayoutStatus) -> Result<()> {
        let _guard = self.writer.lock().await;
        let key = payout.id.as_bytes();
        let current: PayoutRequest = self
            .read(CF_PAYOUTS, key)?
            .ok_or_else(|| PayoutError::NotFound(format!("payout {}", payout.id)))?;
        if current.status != expected {
            return Err(PayoutError::AlreadyProcessed(current.status));
        }
        self.write(CF_PAYOUTS, key, &payout)
    }

    async fn query(&self, query: &PayoutQuery) -> Result<Page<PayoutRequest>> {
        let payouts: Vec<PayoutRequest> = self.scan(CF_PAYOUTS)?;
        Ok(query.apply(payouts))
    }
}

#[async_trait]
impl ReferralStore for RocksDBStore {
    async fn account(&self, owner_id: &str) -> Result<Option<ReferralAccount>> {
        self.read(CF_REFERRAL_ACCOUNTS, owner_id.as_bytes())
    }

    async fn record_earning(&self, earning: ReferralEarning) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let order_key = earning.order_id.as_bytes();
        // Just check if the key exists without decoding the value
        if self
            .db
            .get_pinned_cf(self.cf(CF_REFERRAL_EARNINGS)?, order_key)?
            .is_some()
        {
            return Ok(false);
        }

        let owner_key = earning.referrer_id.as_bytes();
        let mut account = self
            .read(CF_REFERRAL_ACCOUNTS, owner_key)?
            .unwrap_or_else(|| ReferralAccount::new(earning.referrer_id.clone()));
        account.credit(earning.commission);

        // Earning and credit land together or not at all.
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_REFERRAL_EARNINGS)?, order_key, encode(&earning)?);
        batch.put_cf(self.cf(CF_REFERRAL_ACCOUNTS)?, owner_key, encode(&account)?);
        self.db.write(batch)?;
        Ok(true)
    }

    async fn adjust(
        &self,
        owner_id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<ReferralAccount> {
        let _guard = self.writer.lock().await;
        let mut account = self
            .read(CF_REFERRAL_ACCOUNTS, owner_id.as_bytes())?
            .unwrap_or_else(|| ReferralAccount::new(owner_id));
        account.apply(adjustment)?;
        self.write(CF_REFERRAL_ACCOUNTS, owner_id.as_bytes(), &account)?;
        Ok(account)
    }

    async fn earnings(&self, owner_id: &str) -> Result<Vec<ReferralEarning>> {
        let mut earnings: Vec<ReferralEarning> = self
            .scan::<ReferralEarning>(CF_REFERRAL_EARNINGS)?
            .into_iter()
            .filter(|e| e.referrer_id == owner_id)
            .collect();
        earnings.sort_by(|a, b| a.credited_at.cmp(&b.credited_at));
        Ok(earnings)
    }
}
