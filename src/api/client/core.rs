//! Core client implementation
//!
//! This module provides a client implementation that wraps Core directly,
//! providing the same interface as HttpClient but without HTTP overhead.

use super::{Client, ClientError};
use crate::config::OutlineConfig;
use crate::events::EventRecord;
use crate::models::{ItemId, ItemRecord};
use crate::operation::{Dispatched, Operation};
use crate::outline::{Core, OutlineError};

/// A client implementation that wraps Core directly
#[derive(Debug, Clone)]
pub struct CoreClient {
    core: Core,
}

impl CoreClient {
    pub fn new(core: Core) -> Self {
        Self { core }
    }
}

#[async_trait::async_trait]
impl Client for CoreClient {
    async fn outline(&self) -> Result<Vec<ItemRecord>, ClientError> {
        Ok(self.core.records())
    }

    async fn item(&self, id: &ItemId) -> Result<ItemRecord, ClientError> {
        self.core
            .record(id)
            .ok_or_else(|| OutlineError::UnknownItem(id.clone()).into())
    }

    async fn config(&self) -> Result<OutlineConfig, ClientError> {
        Ok(self.core.config())
    }

    // Feature flags are an HTTP concern; in-process callers get the full engine
    async fn dispatch(&self, op: Operation) -> Result<Dispatched, ClientError> {
        self.core.dispatch(op).map_err(ClientError::from)
    }

    async fn events_since(&self, since: u64) -> Result<Vec<EventRecord>, ClientError> {
        Ok(self.core.events_since(since))
    }
}
