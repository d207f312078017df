// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! TTL result caches. Entries are only ever evicted by age or capacity;
//! schema changes in the database are not observed.

use crate::model::VisualizationRequest;
use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait ResultCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V>;
    async fn insert(&self, key: String, value: V);
    fn invalidate_all(&self);
}

pub struct MokaCache<V> {
    inner: Cache<String, V>,
}

impl<V> MokaCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }
}

#[async_trait]
impl<V> ResultCache<V> for MokaCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await
    }

    async fn insert(&self, key: String, value: V) {
        self.inner.insert(key, value).await;
    }

    fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

/// Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl<V> ResultCache<V> for DisabledCache
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, _key: &str) -> Option<V> {
        None
    }

    async fn insert(&self, _key: String, _value: V) {}

    fn invalidate_all(&self) {}
}

pub fn build_cache<V>(enabled: bool, ttl_secs: u64, max_capacity: u64) -> Arc<dyn ResultCache<V>>
where
    V: Clone + Send + Sync + 'static,
{
    if enabled && ttl_secs > 0 {
        Arc::new(MokaCache::new(Duration::from_secs(ttl_secs), max_capacity))
    } else {
        Arc::new(DisabledCache)
    }
}

/// SHA-256 over the request's canonical JSON form, hex encoded.
pub fn fingerprint(request: &VisualizationRequest) -> String {
    let bytes = serde_json::to_vec(request).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}
