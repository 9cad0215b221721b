//! Order submission: builder-fee discipline, single and batched legs,
//! and per-leg receipt synthesis.

use crate::collateral::CollateralManager;
use crate::config::BuilderConfig;
use crate::domain::{
    Address, BuilderInfo, Decimal, ExecutionPlan, ExecutionReceipt, OrderRequest, OrderStatus,
    SplitExecutionPlan, SplitExecutionReceipt,
};
use crate::venue::VenueClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Executor {
    venue: Arc<dyn VenueClient>,
    builder: Option<BuilderConfig>,
    approval_checked: AtomicBool,
}

impl Executor {
    pub fn new(venue: Arc<dyn VenueClient>, builder: Option<BuilderConfig>) -> Self {
        Executor {
            venue,
            builder,
            approval_checked: AtomicBool::new(false),
        }
    }

    fn builder_info(&self) -> Option<BuilderInfo> {
        self.builder.as_ref().map(|b| BuilderInfo {
            address: b.address.clone(),
            // The venue counts fees in tenth-of-a-bps units.
            fee_in_tenth_bps: b.fee_bps * 10,
        })
    }

    /// Check (and if needed raise) the builder-fee authorization, at most
    /// once per process. Approval failures are logged and never abort the
    /// trade; the flag is set either way to avoid retry floods.
    async fn ensure_builder_approval(&self, user: &Address) {
        let Some(builder) = &self.builder else {
            return;
        };
        if self
            .approval_checked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let required = builder.fee_bps * 10;
        match self.venue.max_builder_fee(user, &builder.address).await {
            Ok(current) if current >= required => {
                debug!(current, required, "builder fee already authorized");
            }
            Ok(_) => {
                let rate = fee_rate_string(builder.fee_bps);
                if let Err(e) = self
                    .venue
                    .approve_builder_fee(&rate, &builder.address)
                    .await
                {
                    warn!(error = %e, "builder fee approval failed; continuing without it");
                }
            }
            Err(e) => {
                warn!(error = %e, "builder fee check failed; continuing without approval");
            }
        }
    }

    /// Submit one leg and synthesize its receipt. Venue exceptions become
    /// failed receipts rather than propagating.
    pub async fn execute(&self, plan: &ExecutionPlan, user: &Address) -> ExecutionReceipt {
        self.ensure_builder_approval(user).await;
        let request = order_request(plan);
        match self
            .venue
            .place_order(&request, self.builder_info().as_ref())
            .await
        {
            Ok(status) => leg_receipt(plan, status),
            Err(e) => failed_leg(plan, e.to_string()),
        }
    }

    /// Prepare collateral against live balances, then submit all legs as
    /// one batch. A failed preparation aborts before any perp leg is
    /// placed.
    pub async fn execute_split(
        &self,
        plan: &SplitExecutionPlan,
        collateral: &CollateralManager,
        user: &Address,
    ) -> SplitExecutionReceipt {
        let live_plan = match collateral
            .estimate_requirements(&plan.allocations, user)
            .await
        {
            Ok(live_plan) => live_plan,
            Err(e) => {
                return SplitExecutionReceipt {
                    success: false,
                    legs: Vec::new(),
                    collateral: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let mut collateral_receipt = None;
        if live_plan.swaps_needed {
            let receipt = collateral.prepare(&live_plan, user).await;
            let prepared = receipt.success;
            collateral_receipt = Some(receipt);
            if !prepared {
                return SplitExecutionReceipt {
                    success: false,
                    legs: Vec::new(),
                    collateral: collateral_receipt,
                    error: Some("collateral preparation failed".to_string()),
                };
            }
        }

        self.ensure_builder_approval(user).await;
        let requests: Vec<OrderRequest> = plan.legs.iter().map(order_request).collect();
        let legs = match self
            .venue
            .batch_orders(&requests, self.builder_info().as_ref())
            .await
        {
            Ok(statuses) => {
                let mut statuses = statuses.into_iter();
                plan.legs
                    .iter()
                    .map(|leg| match statuses.next() {
                        Some(status) => leg_receipt(leg, status),
                        None => failed_leg(leg, "no status returned for leg".to_string()),
                    })
                    .collect::<Vec<_>>()
            }
            Err(e) => {
                let message = e.to_string();
                plan.legs
                    .iter()
                    .map(|leg| failed_leg(leg, message.clone()))
                    .collect()
            }
        };

        let success = legs.iter().all(|leg| leg.success);
        SplitExecutionReceipt {
            success,
            legs,
            collateral: collateral_receipt,
            error: None,
        }
    }
}

/// Percent string for the approval action: 5 bps -> "0.05%".
fn fee_rate_string(fee_bps: u32) -> String {
    format!(
        "{}%",
        Decimal::from_i64(fee_bps as i64) / Decimal::from_i64(100)
    )
}

fn order_request(plan: &ExecutionPlan) -> OrderRequest {
    OrderRequest {
        asset_index: plan.market.asset_index,
        is_buy: plan.side.is_buy(),
        price: plan.limit_price,
        size: plan.size,
        reduce_only: false,
        order_type: plan.order_type,
        client_order_id: None,
    }
}

fn leg_receipt(plan: &ExecutionPlan, status: OrderStatus) -> ExecutionReceipt {
    match status {
        OrderStatus::Filled {
            total_size,
            avg_price,
            order_id,
        } => ExecutionReceipt {
            success: true,
            coin: plan.market.coin.clone(),
            side: plan.side,
            requested_size: plan.size,
            filled_size: total_size,
            avg_price: Some(avg_price),
            order_id: Some(order_id),
            error: None,
        },
        // The submission itself succeeded; an IOC that rests simply
        // missed, which is not a submission failure.
        OrderStatus::Resting { order_id, .. } => ExecutionReceipt {
            success: true,
            coin: plan.market.coin.clone(),
            side: plan.side,
            requested_size: plan.size,
            filled_size: Decimal::zero(),
            avg_price: None,
            order_id: Some(order_id),
            error: None,
        },
        OrderStatus::WaitingForFill | OrderStatus::WaitingForTrigger => ExecutionReceipt {
            success: true,
            coin: plan.market.coin.clone(),
            side: plan.side,
            requested_size: plan.size,
            filled_size: Decimal::zero(),
            avg_price: None,
            order_id: None,
            error: None,
        },
        OrderStatus::Error(message) => failed_leg(plan, message),
    }
}

fn failed_leg(plan: &ExecutionPlan, error: String) -> ExecutionReceipt {
    ExecutionReceipt {
        success: false,
        coin: plan.market.coin.clone(),
        side: plan.side,
        requested_size: plan.size,
        filled_size: Decimal::zero(),
        avg_price: None,
        order_id: None,
        error: Some(error),
    }
}
