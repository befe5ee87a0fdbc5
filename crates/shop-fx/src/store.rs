//! # File Rate Store
//!
//! Persistent rate cache: one JSON document, `exchange_rates.json`, in a
//! configured directory. Writes go to a temporary file first and are
//! renamed into place.

use async_trait::async_trait;
use shop_core::{ExchangeRates, RateStore, ShopError, ShopResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Storage key of the cached rate table
pub const RATES_STORAGE_KEY: &str = "exchange_rates";

/// `RateStore` backed by a JSON file, using `tokio::fs`
#[derive(Debug, Clone)]
pub struct FileRateStore {
    path: PathBuf,
}

impl FileRateStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", RATES_STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RateStore for FileRateStore {
    async fn load(&self) -> ShopResult<Option<ExchangeRates>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShopError::Storage(format!("{}: {}", self.path.display(), e))),
        };

        let rates = serde_json::from_str(&raw)
            .map_err(|e| ShopError::Storage(format!("corrupt rate cache: {}", e)))?;
        Ok(Some(rates))
    }

    async fn save(&self, rates: &ExchangeRates) -> ShopResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| ShopError::Storage(e.to_string()))?;
        }

        let json = serde_json::to_vec(rates)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| ShopError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| ShopError::Storage(e.to_string()))?;

        debug!(path = %self.path.display(), "saved rate cache");
        Ok(())
    }

    async fn clear(&self) -> ShopResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShopError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::HashMap;

    fn rates() -> ExchangeRates {
        ExchangeRates::new(
            "USD",
            HashMap::from([("EUR".to_string(), 0.92)]),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRateStore::new(dir.path());

        assert!(store.load().await.unwrap().is_none());
        assert!(store.clear().await.is_ok());
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRateStore::new(dir.path().join("nested"));

        store.save(&rates()).await.unwrap();
        assert!(store.path().ends_with("exchange_rates.json"));
        assert_eq!(store.load().await.unwrap(), Some(rates()));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"updatedAt\""));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRateStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load().await, Err(ShopError::Storage(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_store_runs_on_single_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRateStore::new(dir.path());

        // A ticking task keeps running while the store does file IO
        let ticker = tokio::spawn(async {
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
        });
        store.save(&rates()).await.unwrap();
        assert!(store.load().await.unwrap().is_some());
        ticker.await.unwrap();
    }
}
