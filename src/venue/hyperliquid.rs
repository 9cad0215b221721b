//! HTTP venue client.
//!
//! Reads go through the public info endpoint with retry/backoff; writes are
//! signed exchange actions. A client constructed without a key is read-only.

use super::{VenueClient, VenueError};
use crate::domain::{
    Address, AssetContext, AssetPosition, BookLevel, BuilderInfo, ClearinghouseState, Coin,
    Decimal, FundingEntry, L2Book, MarginSummary, OpenOrder, OrderRequest, OrderStatus, OrderType,
    PerpAssetMeta, PerpDex, SpotClearinghouseState, SpotMeta, Tif, TimeMs, TpSl, VenueFill,
};
use alloy::primitives::{hex, keccak256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Mainnet API endpoint.
pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";

/// Testnet API endpoint.
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Venue client over HTTP.
#[derive(Clone)]
pub struct HttpVenueClient {
    client: Client,
    base_url: String,
    signer: Option<PrivateKeySigner>,
}

impl fmt::Debug for HttpVenueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpVenueClient")
            .field("base_url", &self.base_url)
            .field("signing", &self.signer.is_some())
            .finish()
    }
}

impl HttpVenueClient {
    /// Read-only client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            signer: None,
        }
    }

    /// Client capable of signed writes.
    pub fn with_wallet(base_url: impl Into<String>, private_key: &str) -> Result<Self, VenueError> {
        let signer: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| VenueError::Parse("malformed private key".to_string()))?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.into(),
            signer: Some(signer),
        })
    }

    /// Address derived from the signing key, if present.
    pub fn wallet_address(&self) -> Option<Address> {
        self.signer
            .as_ref()
            .map(|s| Address::new(format!("{:#x}", s.address())))
    }

    async fn post_info(&self, payload: Value) -> Result<Value, VenueError> {
        let url = format!("{}/info", self.base_url);
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(VenueError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(VenueError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(VenueError::Http {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(VenueError::Http {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| backoff::Error::permanent(VenueError::Parse(e.to_string())))
        })
        .await
    }

    /// Sign and submit an exchange action. Writes are never retried: the
    /// venue may have applied a submission whose response was lost.
    async fn post_exchange(&self, action: Value) -> Result<Value, VenueError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| VenueError::ReadOnly("no signing key configured".to_string()))?;

        let nonce = TimeMs::now().as_i64();
        let signed_payload = json!({ "action": &action, "nonce": nonce });
        let bytes = serde_json::to_vec(&signed_payload)
            .map_err(|e| VenueError::Parse(e.to_string()))?;
        let hash = keccak256(&bytes);
        let signature = signer
            .sign_hash_sync(&hash)
            .map_err(|e| VenueError::Rejected(format!("signing failed: {}", e)))?;
        let sig_bytes = signature.as_bytes();
        let mut v = sig_bytes[64] as u64;
        if v < 27 {
            v += 27;
        }

        debug!(action = %action["type"], nonce, "submitting exchange action");

        let body = json!({
            "action": action,
            "nonce": nonce,
            "signature": {
                "r": format!("0x{}", hex::encode(&sig_bytes[..32])),
                "s": format!("0x{}", hex::encode(&sig_bytes[32..64])),
                "v": v,
            },
        });

        let url = format!("{}/exchange", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VenueError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VenueError::Http {
                status: status.as_u16(),
                message: "exchange request failed".to_string(),
            });
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| VenueError::Parse(e.to_string()))?;

        if value.get("status").and_then(|s| s.as_str()) == Some("err") {
            let msg = value
                .get("response")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown venue error");
            return Err(VenueError::Rejected(msg.to_string()));
        }
        Ok(value)
    }

    fn order_statuses(response: &Value) -> Result<Vec<OrderStatus>, VenueError> {
        let statuses = response
            .pointer("/response/data/statuses")
            .and_then(|s| s.as_array())
            .ok_or_else(|| VenueError::Parse("missing order statuses".to_string()))?;
        statuses.iter().map(parse_order_status).collect()
    }
}

fn parse_order_status(value: &Value) -> Result<OrderStatus, VenueError> {
    if let Some(tag) = value.as_str() {
        return match tag {
            "waitingForFill" => Ok(OrderStatus::WaitingForFill),
            "waitingForTrigger" => Ok(OrderStatus::WaitingForTrigger),
            other => Ok(OrderStatus::Error(other.to_string())),
        };
    }
    if let Some(filled) = value.get("filled") {
        let total_size = decimal_field(filled, "totalSz")?;
        let avg_price = decimal_field(filled, "avgPx")?;
        let order_id = filled.get("oid").and_then(|v| v.as_u64()).unwrap_or(0);
        return Ok(OrderStatus::Filled {
            total_size,
            avg_price,
            order_id,
        });
    }
    if let Some(resting) = value.get("resting") {
        let order_id = resting.get("oid").and_then(|v| v.as_u64()).unwrap_or(0);
        let client_order_id = resting
            .get("cloid")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        return Ok(OrderStatus::Resting {
            order_id,
            client_order_id,
        });
    }
    if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
        return Ok(OrderStatus::Error(msg.to_string()));
    }
    Err(VenueError::Parse(format!(
        "unrecognized order status: {}",
        value
    )))
}

fn decimal_field(value: &Value, field: &str) -> Result<Decimal, VenueError> {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| VenueError::Parse(format!("missing field {}", field)))?;
    Decimal::from_str_canonical(raw)
        .map_err(|e| VenueError::Parse(format!("invalid {}: {}", field, e)))
}

fn order_to_wire(order: &OrderRequest) -> Value {
    let order_type = match &order.order_type {
        OrderType::Limit { tif } => {
            let tif = match tif {
                Tif::Alo => "Alo",
                Tif::Ioc => "Ioc",
                Tif::Gtc => "Gtc",
            };
            json!({ "limit": { "tif": tif } })
        }
        OrderType::Trigger {
            trigger_px,
            is_market,
            tp_or_sl,
        } => {
            let tpsl = match tp_or_sl {
                TpSl::Tp => "tp",
                TpSl::Sl => "sl",
            };
            json!({
                "trigger": {
                    "triggerPx": trigger_px.to_string(),
                    "isMarket": is_market,
                    "tpsl": tpsl,
                }
            })
        }
    };

    let mut wire = json!({
        "a": order.asset_index,
        "b": order.is_buy,
        "p": order.price.to_string(),
        "s": order.size.to_string(),
        "r": order.reduce_only,
        "t": order_type,
    });
    if let Some(cloid) = &order.client_order_id {
        wire["c"] = json!(cloid);
    }
    wire
}

fn builder_to_wire(builder: &BuilderInfo) -> Value {
    json!({
        "b": builder.address.as_str().to_lowercase(),
        "f": builder.fee_in_tenth_bps,
    })
}

fn parse_levels(value: &Value) -> Result<Vec<BookLevel>, VenueError> {
    serde_json::from_value(value.clone()).map_err(|e| VenueError::Parse(e.to_string()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePerpState {
    margin_summary: MarginSummary,
    withdrawable: Decimal,
    #[serde(default)]
    asset_positions: Vec<WireAssetPosition>,
}

#[derive(Deserialize)]
struct WireAssetPosition {
    position: WirePosition,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePosition {
    coin: Coin,
    szi: Decimal,
    #[serde(default)]
    entry_px: Option<Decimal>,
    #[serde(default)]
    unrealized_pnl: Decimal,
    #[serde(default)]
    leverage: Option<WireLeverage>,
    #[serde(default)]
    liquidation_px: Option<Decimal>,
    #[serde(default)]
    margin_used: Decimal,
}

#[derive(Deserialize)]
struct WireLeverage {
    value: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOpenOrder {
    coin: Coin,
    side: String,
    limit_px: Decimal,
    sz: Decimal,
    oid: u64,
    timestamp: TimeMs,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFill {
    coin: Coin,
    px: Decimal,
    sz: Decimal,
    side: String,
    time: TimeMs,
    #[serde(default)]
    fee: Decimal,
    #[serde(default)]
    closed_pnl: Decimal,
    #[serde(default)]
    oid: Option<u64>,
}

#[async_trait]
impl VenueClient for HttpVenueClient {
    async fn meta(&self) -> Result<Vec<PerpAssetMeta>, VenueError> {
        let v = self.post_info(json!({ "type": "meta" })).await?;
        serde_json::from_value(v["universe"].clone())
            .map_err(|e| VenueError::Parse(e.to_string()))
    }

    async fn meta_and_asset_ctxs(
        &self,
        dex: Option<&str>,
    ) -> Result<(Vec<PerpAssetMeta>, Vec<AssetContext>), VenueError> {
        let mut payload = json!({ "type": "metaAndAssetCtxs" });
        if let Some(dex) = dex {
            payload["dex"] = json!(dex);
        }
        let v = self.post_info(payload).await?;
        let pair = v
            .as_array()
            .filter(|a| a.len() == 2)
            .ok_or_else(|| VenueError::Parse("expected [meta, ctxs] pair".to_string()))?;
        let universe: Vec<PerpAssetMeta> = serde_json::from_value(pair[0]["universe"].clone())
            .map_err(|e| VenueError::Parse(e.to_string()))?;
        let ctxs: Vec<AssetContext> = serde_json::from_value(pair[1].clone())
            .map_err(|e| VenueError::Parse(e.to_string()))?;
        Ok((universe, ctxs))
    }

    async fn perp_dexs(&self) -> Result<Vec<PerpDex>, VenueError> {
        let v = self.post_info(json!({ "type": "perpDexs" })).await?;
        let entries = v
            .as_array()
            .ok_or_else(|| VenueError::Parse("expected deployer array".to_string()))?;
        entries
            .iter()
            .map(|entry| {
                // The native first-party dex is reported as null.
                if entry.is_null() {
                    Ok(PerpDex::default())
                } else {
                    serde_json::from_value(entry.clone())
                        .map_err(|e| VenueError::Parse(e.to_string()))
                }
            })
            .collect()
    }

    async fn spot_meta(&self) -> Result<SpotMeta, VenueError> {
        let v = self.post_info(json!({ "type": "spotMeta" })).await?;
        serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))
    }

    async fn l2_book(&self, coin: &str, n_sig_figs: Option<u32>) -> Result<L2Book, VenueError> {
        let mut payload = json!({ "type": "l2Book", "coin": coin });
        if let Some(n) = n_sig_figs {
            payload["nSigFigs"] = json!(n);
        }
        let v = self.post_info(payload).await?;
        let levels = v
            .get("levels")
            .and_then(|l| l.as_array())
            .filter(|l| l.len() == 2)
            .ok_or_else(|| VenueError::Parse("expected [bids, asks] levels".to_string()))?;
        Ok(L2Book {
            coin: Coin::new(
                v.get("coin")
                    .and_then(|c| c.as_str())
                    .unwrap_or(coin)
                    .to_string(),
            ),
            time_ms: TimeMs::new(v.get("time").and_then(|t| t.as_i64()).unwrap_or_default()),
            bids: parse_levels(&levels[0])?,
            asks: parse_levels(&levels[1])?,
        })
    }

    async fn clearinghouse_state(
        &self,
        user: &Address,
    ) -> Result<ClearinghouseState, VenueError> {
        let v = self
            .post_info(json!({ "type": "clearinghouseState", "user": user.as_str() }))
            .await?;
        let wire: WirePerpState =
            serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))?;
        Ok(ClearinghouseState {
            margin_summary: wire.margin_summary,
            withdrawable: wire.withdrawable,
            asset_positions: wire
                .asset_positions
                .into_iter()
                .map(|p| AssetPosition {
                    coin: p.position.coin,
                    szi: p.position.szi,
                    entry_px: p.position.entry_px,
                    unrealized_pnl: p.position.unrealized_pnl,
                    leverage: p.position.leverage.map(|l| l.value).unwrap_or(1),
                    liquidation_px: p.position.liquidation_px,
                    margin_used: p.position.margin_used,
                })
                .collect(),
        })
    }

    async fn spot_clearinghouse_state(
        &self,
        user: &Address,
    ) -> Result<SpotClearinghouseState, VenueError> {
        let v = self
            .post_info(json!({ "type": "spotClearinghouseState", "user": user.as_str() }))
            .await?;
        serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))
    }

    async fn open_orders(&self, user: &Address) -> Result<Vec<OpenOrder>, VenueError> {
        let v = self
            .post_info(json!({ "type": "openOrders", "user": user.as_str() }))
            .await?;
        let wire: Vec<WireOpenOrder> =
            serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))?;
        Ok(wire
            .into_iter()
            .map(|o| OpenOrder {
                coin: o.coin,
                is_buy: o.side == "B",
                limit_px: o.limit_px,
                sz: o.sz,
                oid: o.oid,
                timestamp: o.timestamp,
            })
            .collect())
    }

    async fn user_fills(&self, user: &Address) -> Result<Vec<VenueFill>, VenueError> {
        let v = self
            .post_info(json!({ "type": "userFills", "user": user.as_str() }))
            .await?;
        let wire: Vec<WireFill> =
            serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))?;
        Ok(wire
            .into_iter()
            .map(|f| VenueFill {
                coin: f.coin,
                px: f.px,
                sz: f.sz,
                is_buy: f.side == "B",
                time: f.time,
                fee: f.fee,
                closed_pnl: f.closed_pnl,
                oid: f.oid,
            })
            .collect())
    }

    async fn funding_history(
        &self,
        coin: &str,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Vec<FundingEntry>, VenueError> {
        let mut payload = json!({
            "type": "fundingHistory",
            "coin": coin,
            "startTime": start_ms,
        });
        if let Some(end) = end_ms {
            payload["endTime"] = json!(end);
        }
        let v = self.post_info(payload).await?;
        serde_json::from_value(v).map_err(|e| VenueError::Parse(e.to_string()))
    }

    async fn place_order(
        &self,
        order: &OrderRequest,
        builder: Option<&BuilderInfo>,
    ) -> Result<OrderStatus, VenueError> {
        let statuses = self.batch_orders(std::slice::from_ref(order), builder).await?;
        statuses
            .into_iter()
            .next()
            .ok_or_else(|| VenueError::Parse("empty status list".to_string()))
    }

    async fn batch_orders(
        &self,
        orders: &[OrderRequest],
        builder: Option<&BuilderInfo>,
    ) -> Result<Vec<OrderStatus>, VenueError> {
        let mut action = json!({
            "type": "order",
            "orders": orders.iter().map(order_to_wire).collect::<Vec<_>>(),
            "grouping": "na",
        });
        if let Some(builder) = builder {
            action["builder"] = builder_to_wire(builder);
        }
        let response = self.post_exchange(action).await?;
        Self::order_statuses(&response)
    }

    async fn cancel_order(&self, asset_index: u32, order_id: u64) -> Result<(), VenueError> {
        let action = json!({
            "type": "cancel",
            "cancels": [{ "a": asset_index, "o": order_id }],
        });
        self.post_exchange(action).await.map(|_| ())
    }

    async fn approve_builder_fee(
        &self,
        max_fee_rate_pct: &str,
        builder: &Address,
    ) -> Result<(), VenueError> {
        let action = json!({
            "type": "approveBuilderFee",
            "maxFeeRate": max_fee_rate_pct,
            "builder": builder.as_str().to_lowercase(),
        });
        self.post_exchange(action).await.map(|_| ())
    }

    async fn max_builder_fee(
        &self,
        user: &Address,
        builder: &Address,
    ) -> Result<u32, VenueError> {
        let v = self
            .post_info(json!({
                "type": "maxBuilderFee",
                "user": user.as_str(),
                "builder": builder.as_str().to_lowercase(),
            }))
            .await?;
        v.as_u64()
            .map(|n| n as u32)
            .ok_or_else(|| VenueError::Parse("expected numeric fee authorization".to_string()))
    }

    async fn set_leverage(
        &self,
        asset_index: u32,
        leverage: u32,
        is_cross: bool,
    ) -> Result<(), VenueError> {
        let action = json!({
            "type": "updateLeverage",
            "asset": asset_index,
            "isCross": is_cross,
            "leverage": leverage,
        });
        self.post_exchange(action).await.map(|_| ())
    }

    async fn usd_class_transfer(&self, amount: Decimal, to_perp: bool) -> Result<(), VenueError> {
        let action = json!({
            "type": "usdClassTransfer",
            "amount": amount.to_string(),
            "toPerp": to_perp,
        });
        self.post_exchange(action).await.map(|_| ())
    }

    async fn set_dex_abstraction(&self, enabled: bool) -> Result<(), VenueError> {
        let action = json!({
            "type": "setDexAbstraction",
            "enabled": enabled,
        });
        self.post_exchange(action).await.map(|_| ())
    }
}
