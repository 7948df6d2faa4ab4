use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockline_types::{Block, BlockStatus};

use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Inputs to the inventory fold that do not live on the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Maximum number of entries in the activity feed.
    pub activity_limit: usize,
    /// Stock strictly below this level is reported as `low`.
    pub low_threshold: i64,
    /// Stock strictly below this level is reported as `critical`.
    pub critical_threshold: i64,
    /// Baseline stock per product before any ledger entry.
    pub initial_stock: BTreeMap<String, i64>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        let initial_stock = [
            ("Bulk Groceries", 2847),
            ("Electronics", 1650),
            ("Home Goods", 1980),
            ("Toys", 750),
            ("Health & Beauty", 1320),
            ("Office Supplies", 680),
            ("Automotive", 980),
            ("Sports", 1180),
        ]
        .into_iter()
        .map(|(product, stock)| (product.to_string(), stock))
        .collect();

        Self {
            activity_limit: 10,
            low_threshold: 1500,
            critical_threshold: 1000,
            initial_stock,
        }
    }
}

impl ProjectionConfig {
    pub fn stock_level(&self, stock: i64) -> StockLevel {
        if stock < self.critical_threshold {
            StockLevel::Critical
        } else if stock < self.low_threshold {
            StockLevel::Low
        } else {
            StockLevel::Stable
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Critical,
    Low,
    Stable,
}

/// One ledger entry as seen from a product's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub change: i64,
    pub timestamp: DateTime<Utc>,
    pub note: String,
    pub user: String,
    pub status: BlockStatus,
}

/// Derived state of a single product.
///
/// Incoming and outgoing totals are quantities (always non-negative), split
/// by whether the contributing blocks are confirmed or still pending.
/// Rejected blocks appear in `changes` but in none of the totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProjection {
    pub initial_stock: i64,
    pub current_stock: i64,
    pub incoming_confirmed: u64,
    pub incoming_pending: u64,
    pub outgoing_confirmed: u64,
    pub outgoing_pending: u64,
    pub changes: Vec<ChangeRecord>,
    pub last_change_at: Option<DateTime<Utc>>,
    pub stock_level: StockLevel,
}

impl ProductProjection {
    fn baseline(initial_stock: i64) -> Self {
        Self {
            initial_stock,
            current_stock: initial_stock,
            incoming_confirmed: 0,
            incoming_pending: 0,
            outgoing_confirmed: 0,
            outgoing_pending: 0,
            changes: Vec::new(),
            last_change_at: None,
            stock_level: StockLevel::Stable,
        }
    }

    fn fold(&mut self, block: &Block) {
        let delta = block.payload.quantity_delta;
        let status = block.status();

        // Saturate rather than wrap: stores may predate the delta bound.
        if status == BlockStatus::Confirmed {
            self.current_stock = self.current_stock.saturating_add(delta);
        }

        let total = match (delta > 0, status) {
            (true, BlockStatus::Confirmed) => Some(&mut self.incoming_confirmed),
            (true, BlockStatus::Pending) => Some(&mut self.incoming_pending),
            (false, BlockStatus::Confirmed) => Some(&mut self.outgoing_confirmed),
            (false, BlockStatus::Pending) => Some(&mut self.outgoing_pending),
            (_, BlockStatus::Rejected) => None,
        };
        if let Some(total) = total {
            *total = total.saturating_add(delta.unsigned_abs());
        }

        self.changes.push(ChangeRecord {
            change: delta,
            timestamp: block.timestamp,
            note: block.payload.note.clone(),
            user: block.payload.submitted_by.clone(),
            status,
        });
        self.last_change_at = Some(block.timestamp);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Supply,
    Order,
}

/// Entry in the recent-activity feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub product: String,
    pub quantity: u64,
    pub time: DateTime<Utc>,
    pub status: BlockStatus,
}

impl Activity {
    fn from_block(block: &Block) -> Self {
        let delta = block.payload.quantity_delta;
        Self {
            id: block.index,
            kind: if delta > 0 {
                ActivityKind::Supply
            } else {
                ActivityKind::Order
            },
            product: block.payload.product.clone(),
            quantity: delta.unsigned_abs(),
            time: block.timestamp,
            status: block.status(),
        }
    }
}

/// Inventory summary derived from the whole chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InventoryProjection {
    pub inventory: BTreeMap<String, ProductProjection>,
    /// Most recent first.
    pub activities: Vec<Activity>,
}

/// Deterministic projection builders.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn inventory<R: LedgerReader + ?Sized>(
        reader: &R,
        config: &ProjectionConfig,
    ) -> Result<InventoryProjection, LedgerError> {
        let chain = reader.chain()?;
        Ok(Self::from_blocks(&chain, config))
    }

    pub fn from_blocks(blocks: &[Block], config: &ProjectionConfig) -> InventoryProjection {
        let mut inventory: BTreeMap<String, ProductProjection> = config
            .initial_stock
            .iter()
            .map(|(product, stock)| (product.clone(), ProductProjection::baseline(*stock)))
            .collect();
        let mut activities = Vec::new();

        for block in blocks.iter().filter(|b| !b.is_genesis()) {
            inventory
                .entry(block.payload.product.clone())
                .or_insert_with(|| ProductProjection::baseline(0))
                .fold(block);

            if block.status() != BlockStatus::Rejected {
                activities.push(Activity::from_block(block));
            }
        }

        for entry in inventory.values_mut() {
            entry.stock_level = config.stock_level(entry.current_stock);
        }

        let skip = activities.len().saturating_sub(config.activity_limit);
        let mut activities = activities.split_off(skip);
        activities.reverse();

        InventoryProjection {
            inventory,
            activities,
        }
    }
}
