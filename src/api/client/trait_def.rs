//! Client trait definition
//!
//! This module defines the `Client` trait that abstracts over different client implementations.

use super::ClientError;
use crate::config::OutlineConfig;
use crate::events::EventRecord;
use crate::models::{ItemId, ItemRecord};
use crate::operation::{Dispatched, Operation};

/// Trait defining the API client interface for an outline
#[async_trait::async_trait]
pub trait Client {
    /// Get the whole outline as nested records
    async fn outline(&self) -> Result<Vec<ItemRecord>, ClientError>;

    /// Get one item and its subtree
    async fn item(&self, id: &ItemId) -> Result<ItemRecord, ClientError>;

    /// Get the active configuration
    async fn config(&self) -> Result<OutlineConfig, ClientError>;

    /// Apply an operation
    async fn dispatch(&self, op: Operation) -> Result<Dispatched, ClientError>;

    /// Events with a sequence number greater than `since`
    async fn events_since(&self, since: u64) -> Result<Vec<EventRecord>, ClientError>;
}
