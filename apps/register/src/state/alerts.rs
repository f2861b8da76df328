//! # Low-Stock Monitor
//!
//! Background task that periodically lists products at or below the
//! low-stock threshold and publishes the list on a `watch` channel.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LowStockMonitor::start()                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  loop {                                                                 │
//! │    select! {                                                            │
//! │      tick ──► settings.low_stock_threshold                             │
//! │               products.low_stock(threshold)                            │
//! │               warn! for products that just became low                  │
//! │               alerts_tx.send_replace(list)  ──► LowStockHandle          │
//! │      shutdown ──► break                                                 │
//! │    }                                                                    │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::time::Duration;

use apotheca_core::Product;
use apotheca_db::{Database, DbResult};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// A product at or below the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub threshold: i64,
}

impl LowStockAlert {
    fn from_product(product: Product, threshold: i64) -> Self {
        LowStockAlert {
            product_id: product.id,
            name: product.name,
            quantity: product.quantity,
            threshold,
        }
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity <= 0
    }
}

/// Polls the stock ledger for low-stock products.
#[derive(Debug, Clone)]
pub struct LowStockMonitor {
    db: Database,
    poll_interval: Duration,
}

impl LowStockMonitor {
    pub fn new(db: Database, poll_interval: Duration) -> Self {
        LowStockMonitor { db, poll_interval }
    }

    /// One check, using the threshold from the settings row.
    pub async fn check(&self) -> DbResult<Vec<LowStockAlert>> {
        let threshold = self.db.settings().get().await?.low_stock_threshold;
        let products = self.db.products().low_stock(threshold).await?;

        Ok(products
            .into_iter()
            .map(|p| LowStockAlert::from_product(p, threshold))
            .collect())
    }

    /// Spawns the polling loop and returns a handle to it.
    pub fn start(self) -> LowStockHandle {
        let (alerts_tx, alerts_rx) = watch::channel(Vec::new());
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(alerts_tx, shutdown_rx).await;
        });

        LowStockHandle {
            alerts: alerts_rx,
            shutdown_tx,
        }
    }

    /// Main monitor loop.
    async fn run(
        self,
        alerts_tx: watch::Sender<Vec<LowStockAlert>>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!(interval_secs = self.poll_interval.as_secs(), "Low-stock monitor started");

        let mut ticker = interval(self.poll_interval);
        let mut known: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.check().await {
                        Ok(alerts) => {
                            for alert in newly_low(&known, &alerts) {
                                warn!(
                                    product_id = %alert.product_id,
                                    name = %alert.name,
                                    quantity = alert.quantity,
                                    threshold = alert.threshold,
                                    "Product is low on stock"
                                );
                            }
                            known = alerts.iter().map(|a| a.product_id.clone()).collect();
                            debug!(count = alerts.len(), "Low-stock check complete");
                            alerts_tx.send_replace(alerts);
                        }
                        Err(e) => warn!(error = %e, "Low-stock check failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Low-stock monitor shutting down");
                    break;
                }
            }
        }
    }
}

/// Alerts not present in the previous check.
fn newly_low<'a>(known: &HashSet<String>, alerts: &'a [LowStockAlert]) -> Vec<&'a LowStockAlert> {
    alerts
        .iter()
        .filter(|a| !known.contains(&a.product_id))
        .collect()
}

/// Handle for reading alerts and stopping a running monitor.
///
/// Dropping the handle also stops the monitor.
#[derive(Debug)]
pub struct LowStockHandle {
    alerts: watch::Receiver<Vec<LowStockAlert>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl LowStockHandle {
    /// The latest published list.
    pub fn current(&self) -> Vec<LowStockAlert> {
        self.alerts.borrow().clone()
    }

    /// A receiver that wakes on every published list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<LowStockAlert>> {
        self.alerts.clone()
    }

    /// Signals the monitor to stop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apotheca_core::{Category, ProductDraft};
    use apotheca_db::DbConfig;

    fn alert(id: &str, quantity: i64) -> LowStockAlert {
        LowStockAlert {
            product_id: id.to_string(),
            name: id.to_string(),
            quantity,
            threshold: 10,
        }
    }

    #[test]
    fn test_newly_low_skips_known() {
        let known: HashSet<String> = ["a".to_string()].into_iter().collect();
        let alerts = vec![alert("a", 2), alert("b", 0)];

        let fresh = newly_low(&known, &alerts);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].product_id, "b");
        assert!(fresh[0].is_out_of_stock());
    }

    #[tokio::test]
    async fn test_monitor_publishes_low_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, quantity) in [("Panadol", 3), ("Brufen", 50)] {
            db.products()
                .insert(ProductDraft {
                    name: name.to_string(),
                    category: Category::Tablet,
                    quantity,
                    sale_price_cents: 500,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let handle = LowStockMonitor::new(db, Duration::from_secs(3600)).start();
        let mut rx = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(10), rx.changed())
            .await
            .unwrap()
            .unwrap();

        let alerts = handle.current();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].name, "Panadol");
        assert_eq!(alerts[0].threshold, apotheca_core::DEFAULT_LOW_STOCK_THRESHOLD);

        handle.shutdown().await;
    }
}
