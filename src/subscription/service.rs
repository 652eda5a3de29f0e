//! Subscription operations over the key-value store.
//!
//! Every read-modify-write sequence runs under `write_lock`, so concurrent
//! mutations are applied one after another instead of overwriting each
//! other. Cascades into the collection list are a second write: if it fails
//! the subscription write is not rolled back. Writes may touch the disk, so
//! they run on the blocking pool.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{FlowError, StoreError, SubscriptionError};
use crate::metrics;
use crate::store::{
    delete_by_name, find_by_name, update_by_name, JsonFileStore, KvStore, KvStoreExt,
    COLLECTIONS_KEY, SUBS_KEY,
};

use super::flow::{FlowFetcher, FlowInfo, HttpFlowFetcher};
use super::types::{Collection, Subscription, SubscriptionPatch};

/// Subscription CRUD and flow lookup.
pub struct SubscriptionService {
    store: Arc<dyn KvStore>,
    flow: Arc<dyn FlowFetcher>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService").finish_non_exhaustive()
    }
}

impl SubscriptionService {
    /// Create the service, seeding empty subscription and collection lists
    /// when the store has none.
    pub fn new(store: Arc<dyn KvStore>, flow: Arc<dyn FlowFetcher>) -> Result<Self, StoreError> {
        if store.ensure_default::<Vec<Subscription>>(SUBS_KEY)? {
            info!("Initialized empty subscription list");
        }
        if store.ensure_default::<Vec<Collection>>(COLLECTIONS_KEY)? {
            info!("Initialized empty collection list");
        }

        Ok(Self {
            store,
            flow,
            write_lock: Mutex::new(()),
        })
    }

    /// Open the JSON store and HTTP fetcher described by `config`.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let store = Arc::new(JsonFileStore::open(&config.data_path)?);
        let flow = Arc::new(HttpFlowFetcher::new(config)?);
        Ok(Self::new(store, flow)?)
    }

    fn subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.store.read(SUBS_KEY)
    }

    fn collections(&self) -> Result<Vec<Collection>, StoreError> {
        self.store.read(COLLECTIONS_KEY)
    }

    async fn persist<T>(&self, key: &'static str, value: T) -> Result<(), StoreError>
    where
        T: Serialize + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.write(key, &value)).await?
    }

    /// All subscriptions, in stored order.
    pub fn list(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        Ok(self.subscriptions()?)
    }

    /// The subscription called `name`.
    pub fn get(&self, name: &str) -> Result<Subscription, SubscriptionError> {
        let subs = self.subscriptions()?;
        find_by_name(&subs, name)
            .cloned()
            .ok_or_else(|| SubscriptionError::NotFound(name.to_string()))
    }

    /// Append a new subscription. Names must be unique.
    #[instrument(skip(self, sub), fields(name = %sub.name))]
    pub async fn create(&self, sub: Subscription) -> Result<Subscription, SubscriptionError> {
        let _guard = self.write_lock.lock().await;

        info!("Creating subscription");
        let mut subs = self.subscriptions()?;
        if find_by_name(&subs, &sub.name).is_some() {
            warn!("Subscription already exists");
            return Err(SubscriptionError::AlreadyExists(sub.name));
        }

        subs.push(sub.clone());
        self.persist(SUBS_KEY, subs).await?;
        metrics::inc_subscription_mutation("create");

        Ok(sub)
    }

    /// Merge `patch` into the subscription called `name`.
    ///
    /// A rename rewrites every collection that references the old name.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        name: &str,
        patch: SubscriptionPatch,
    ) -> Result<Subscription, SubscriptionError> {
        let _guard = self.write_lock.lock().await;

        let mut subs = self.subscriptions()?;
        let old = find_by_name(&subs, name)
            .ok_or_else(|| SubscriptionError::NotFound(name.to_string()))?;

        info!("Updating subscription");
        let renamed_to = patch.rename_from(name).map(str::to_string);
        let merged = old.merged(patch);

        if let Some(new_name) = renamed_to {
            let mut cols = self.collections()?;
            let touched = cols
                .iter_mut()
                .map(|col| col.rename_member(name, &new_name))
                .filter(|changed| *changed)
                .count();
            self.persist(COLLECTIONS_KEY, cols).await?;
            info!(new_name = %new_name, collections = touched, "Renamed subscription references");
        }

        update_by_name(&mut subs, name, merged.clone());
        self.persist(SUBS_KEY, subs).await?;
        metrics::inc_subscription_mutation("update");

        Ok(merged)
    }

    /// Remove the subscription called `name` and every collection reference
    /// to it. Removing a missing subscription succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<(), SubscriptionError> {
        let _guard = self.write_lock.lock().await;

        info!("Deleting subscription");
        let mut subs = self.subscriptions()?;
        if delete_by_name(&mut subs, name).is_none() {
            info!("Subscription not present, nothing to remove");
        }
        self.persist(SUBS_KEY, subs).await?;

        let mut cols = self.collections()?;
        for col in cols.iter_mut() {
            col.remove_member(name);
        }
        self.persist(COLLECTIONS_KEY, cols).await?;
        metrics::inc_subscription_mutation("delete");

        Ok(())
    }

    /// All collections, in stored order.
    pub fn list_collections(&self) -> Result<Vec<Collection>, SubscriptionError> {
        Ok(self.collections()?)
    }

    /// The collection called `name`.
    pub fn get_collection(&self, name: &str) -> Result<Collection, SubscriptionError> {
        let cols = self.collections()?;
        find_by_name(&cols, name)
            .cloned()
            .ok_or_else(|| SubscriptionError::NotFound(name.to_string()))
    }

    /// Fetch and parse the remote usage header of the subscription `name`.
    #[instrument(skip(self))]
    pub async fn flow_info(&self, name: &str) -> Result<FlowInfo, SubscriptionError> {
        let sub = self.get(name)?;
        if sub.is_local() {
            metrics::inc_flow_fetch("local");
            return Err(SubscriptionError::LocalSource(sub.name));
        }

        let start = Instant::now();
        let fetched = match sub.url.as_deref() {
            Some(url) => self.flow.fetch_flow_headers(url).await,
            None => Err(FlowError::MissingUrl),
        };
        metrics::record_flow_fetch_latency(start);

        let header = match fetched {
            Ok(Some(header)) if !header.trim().is_empty() => header,
            Ok(_) => {
                metrics::inc_flow_fetch("no_header");
                return Err(SubscriptionError::NoFlowInfo(sub.name));
            }
            Err(e) => {
                warn!(error = %e, "Flow fetch failed");
                metrics::inc_flow_fetch("unreachable");
                return Err(SubscriptionError::Unreachable {
                    name: sub.name,
                    reason: e.to_string(),
                });
            }
        };

        match FlowInfo::parse(&header) {
            Some(info) => {
                metrics::inc_flow_fetch("ok");
                Ok(info)
            }
            None => {
                warn!(header = %header, "Malformed flow header");
                metrics::inc_flow_fetch("malformed");
                Err(SubscriptionError::Unreachable {
                    name: sub.name,
                    reason: format!("malformed flow header: {header}"),
                })
            }
        }
    }
}
