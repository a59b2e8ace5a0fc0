//! Finds the order the browser checkout wrote, which may not be visible yet
//! when the gateway's webhook arrives.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::database::models::{Order, OrderItem};
use crate::database::OrderStore;
use crate::error::StoreError;

#[derive(Debug, Error)]
#[error("order lookup failed on attempt {attempt}: {source}")]
pub struct LocateError {
    pub attempt: u32,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for LocatorPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(2),
        }
    }
}

impl From<&AppConfig> for LocatorPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.lookup_max_attempts.max(1),
            interval: config.lookup_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(LocatedOrder),
    NotFound { attempts: u32 },
}

/// Polls the store for the order until it appears or the policy runs out.
/// A miss on every attempt is `Lookup::NotFound`, not an error.
pub async fn locate_order(
    store: &dyn OrderStore,
    gateway_order_id: &str,
    policy: LocatorPolicy,
) -> Result<Lookup, LocateError> {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let found = store
            .find_by_gateway_order_id(gateway_order_id)
            .await
            .map_err(|source| LocateError { attempt, source })?;

        if let Some(order) = found {
            let items = store
                .items_for_order(order.id)
                .await
                .map_err(|source| LocateError { attempt, source })?;
            info!(
                "Located order {} for {gateway_order_id} on attempt {attempt} with {} items",
                order.id,
                items.len()
            );
            return Ok(Lookup::Found(LocatedOrder { order, items }));
        }

        if attempt < max_attempts {
            debug!(
                "Order for {gateway_order_id} not visible yet (attempt {attempt}/{max_attempts}), retrying in {:?}",
                policy.interval
            );
            tokio::time::sleep(policy.interval).await;
        }
    }

    info!("No order found for {gateway_order_id} after {max_attempts} attempts");
    Ok(Lookup::NotFound {
        attempts: max_attempts,
    })
}
