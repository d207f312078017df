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

//! Bounded admission: a fixed number of requests run, a bounded number wait, the rest get 503.

use crate::error::ApiError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RequestGate {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    max_workers: usize,
    queue_capacity: usize,
}

/// Decrements the waiting count even when the queued request is cancelled.
struct QueueSlot(Arc<AtomicUsize>);

impl Drop for QueueSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RequestGate {
    pub fn new(max_workers: usize, queue_capacity: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            waiting: Arc::new(AtomicUsize::new(0)),
            max_workers,
            queue_capacity,
        }
    }

    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, ApiError> {
        if let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() {
            return Ok(permit);
        }
        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _slot = QueueSlot(Arc::clone(&self.waiting));
        if queued >= self.queue_capacity {
            return Err(ApiError::Busy);
        }
        debug!(queued = queued + 1, "Request waiting for a worker");
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Busy)
    }

    pub fn in_flight(&self) -> usize {
        self.max_workers - self.permits.available_permits()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

pub async fn gate_requests(State(gate): State<RequestGate>, request: Request, next: Next) -> Response {
    match gate.admit().await {
        Ok(_permit) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn full_queue_rejects_immediately() {
        let gate = RequestGate::new(1, 0);
        let held = gate.admit().await.unwrap();
        assert_eq!(gate.in_flight(), 1);
        assert!(matches!(gate.admit().await, Err(ApiError::Busy)));
        assert_eq!(gate.waiting(), 0);
        drop(held);
        assert!(gate.admit().await.is_ok());
    }

    #[tokio::test]
    async fn queued_request_runs_once_a_worker_frees_up() {
        let gate = RequestGate::new(1, 1);
        let held = gate.admit().await.unwrap();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.admit().await.map(drop) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gate.waiting(), 1);
        assert!(matches!(gate.admit().await, Err(ApiError::Busy)));
        drop(held);
        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(gate.waiting(), 0);
    }
}
