//! End-to-end execution: collateral preparation strictly before batched
//! legs, builder-fee discipline, and failure-aware receipts.

use hyperprime::config::{BuilderConfig, BuilderSetting};
use hyperprime::domain::{
    Address, AssetContext, Decimal, OrderStatus, PerpAssetMeta, PerpDex, SpotMeta, SpotPair,
    SpotToken,
};
use hyperprime::venue::mock::{book_from, MockVenueClient};
use hyperprime::{Config, PrimeBroker, Side};
use std::sync::Arc;

const TEST_KEY: &str = "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn asset(name: &str) -> PerpAssetMeta {
    PerpAssetMeta {
        name: name.to_string(),
        sz_decimals: 2,
        max_leverage: 10,
        is_delisted: false,
    }
}

fn ctx() -> AssetContext {
    AssetContext {
        funding: Decimal::zero(),
        open_interest: d("1000"),
        mark_px: d("431.25"),
        oracle_px: None,
        mid_px: None,
    }
}

fn spot_meta() -> SpotMeta {
    SpotMeta {
        tokens: vec![
            SpotToken {
                name: "USDC".to_string(),
                index: 0,
            },
            SpotToken {
                name: "USDH".to_string(),
                index: 7,
            },
        ],
        universe: vec![SpotPair {
            name: "USDH/USDC".to_string(),
            index: 107,
            tokens: [7, 0],
        }],
    }
}

/// Native USDC market plus a USDH-margined deployer market, both quoting.
fn venue() -> MockVenueClient {
    MockVenueClient::new()
        .with_spot_meta(spot_meta())
        .with_perp_dexs(vec![
            PerpDex::default(),
            PerpDex {
                name: "xyz".to_string(),
                collateral_token: Some(7),
                ..PerpDex::default()
            },
        ])
        .with_universe("", vec![asset("TSLA")], vec![ctx()])
        .with_universe("xyz", vec![asset("xyz:TSLA0")], vec![ctx()])
        .with_book(book_from("TSLA", &[("431.00", "2")], &[("431.50", "5")]))
        .with_book(book_from("xyz:TSLA0", &[], &[("431.70", "3")]))
        .with_book(book_from(
            "USDH/USDC",
            &[("0.9999", "1000000")],
            &[("1.0001", "1000000")],
        ))
}

fn signed_config() -> Config {
    Config {
        private_key: Some(TEST_KEY.to_string()),
        ..Config::default()
    }
}

async fn broker_with(venue: Arc<MockVenueClient>, config: Config) -> PrimeBroker {
    let broker = PrimeBroker::with_client(config, venue as Arc<dyn hyperprime::VenueClient>).unwrap();
    broker.refresh().await.unwrap();
    broker
}

fn index_of(calls: &[String], prefix: &str) -> usize {
    calls
        .iter()
        .position(|c| c.starts_with(prefix))
        .unwrap_or_else(|| panic!("no call starting with '{}' in {:?}", prefix, calls))
}

#[tokio::test]
async fn test_collateral_prepared_before_legs() {
    let venue = Arc::new(venue());
    let broker = broker_with(Arc::clone(&venue), signed_config()).await;

    let (quote, receipt) = broker.place("TSLA", Side::Buy, d("8")).await.unwrap();

    assert_eq!(quote.plan.legs.len(), 2);
    assert!(receipt.success, "receipt failed: {:?}", receipt.error);
    assert_eq!(receipt.legs.len(), 2);
    assert!(receipt.legs.iter().all(|l| l.success));

    // The USDH shortfall was swapped for.
    let collateral = receipt.collateral.expect("collateral receipt missing");
    assert!(collateral.success);
    assert!(collateral.abstraction_was_enabled);
    assert_eq!(collateral.swaps_executed.len(), 1);
    assert_eq!(collateral.swaps_executed[0].token, "USDH");

    // Strict ordering: abstraction, transfer, spot swap, then the batch.
    let calls = venue.calls();
    let abstraction = index_of(&calls, "setDexAbstraction true");
    let transfer = index_of(&calls, "usdClassTransfer");
    let spot_swap = index_of(&calls, "placeOrder asset=10214");
    let batch = index_of(&calls, "batchOrders n=2");
    assert!(abstraction < transfer);
    assert!(transfer < spot_swap);
    assert!(spot_swap < batch);
}

#[tokio::test]
async fn test_failed_preparation_aborts_before_legs() {
    let venue = Arc::new(venue().with_failing_transfers());
    let broker = broker_with(Arc::clone(&venue), signed_config()).await;

    let (_, receipt) = broker.place("TSLA", Side::Buy, d("8")).await.unwrap();

    assert!(!receipt.success);
    assert!(receipt.legs.is_empty());
    let collateral = receipt.collateral.expect("collateral receipt missing");
    assert!(!collateral.success);
    assert!(collateral.swaps_executed.is_empty());
    // No perp leg was ever submitted.
    assert!(venue.calls().iter().all(|c| !c.starts_with("batchOrders")));
}

#[tokio::test]
async fn test_no_swaps_skips_preparation() {
    // A request small enough for the native USDC market alone.
    let venue = Arc::new(venue());
    let broker = broker_with(Arc::clone(&venue), signed_config()).await;

    let (quote, receipt) = broker.place("TSLA", Side::Buy, d("4")).await.unwrap();

    assert_eq!(quote.plan.legs.len(), 1);
    assert!(receipt.success);
    assert!(receipt.collateral.is_none());
    assert!(venue
        .calls()
        .iter()
        .all(|c| !c.starts_with("setDexAbstraction")));
}

#[tokio::test]
async fn test_builder_fee_wire_conversion() {
    let config = Config {
        builder: BuilderSetting::Custom(BuilderConfig {
            address: Address::new("0x3333333333333333333333333333333333333333".to_string()),
            fee_bps: 5,
        }),
        ..signed_config()
    };
    let venue = Arc::new(venue().with_max_builder_fee(0));
    let broker = broker_with(Arc::clone(&venue), config).await;

    broker.place("TSLA", Side::Buy, d("4")).await.unwrap();
    broker.place("TSLA", Side::Buy, d("4")).await.unwrap();

    let calls = venue.calls();
    // 5 bps approves as a percent string and submits in tenth-bps units.
    assert!(calls.contains(&"approveBuilderFee 0.05%".to_string()));
    assert!(calls.iter().any(|c| c.contains("builderFee=50")));
    // The authorization check runs once per process lifetime.
    let checks = calls.iter().filter(|c| c.as_str() == "maxBuilderFee").count();
    assert_eq!(checks, 1);
}

#[tokio::test]
async fn test_split_success_is_and_of_legs() {
    let venue = Arc::new(
        MockVenueClient::new()
            .with_spot_meta(SpotMeta::default())
            .with_perp_dexs(vec![
                PerpDex::default(),
                PerpDex {
                    name: "abc".to_string(),
                    ..PerpDex::default()
                },
            ])
            .with_universe("", vec![asset("TSLA")], vec![ctx()])
            .with_universe("abc", vec![asset("abc:TSLA")], vec![ctx()])
            .with_book(book_from("TSLA", &[], &[("431.50", "5")]))
            .with_book(book_from("abc:TSLA", &[], &[("431.70", "3")]))
            .with_order_status(OrderStatus::Filled {
                total_size: d("5"),
                avg_price: d("431.50"),
                order_id: 1,
            })
            .with_order_status(OrderStatus::Error("Insufficient margin".to_string())),
    );
    let broker = broker_with(Arc::clone(&venue), signed_config()).await;

    let (_, receipt) = broker.place("TSLA", Side::Buy, d("8")).await.unwrap();

    assert!(!receipt.success);
    assert_eq!(receipt.legs.len(), 2);
    assert!(receipt.legs[0].success);
    assert!(!receipt.legs[1].success);
    assert_eq!(
        receipt.legs[1].error.as_deref(),
        Some("Insufficient margin")
    );
}

#[tokio::test]
async fn test_resting_leg_counts_as_submitted() {
    let venue = Arc::new(
        MockVenueClient::new()
            .with_spot_meta(SpotMeta::default())
            .with_perp_dexs(vec![PerpDex::default()])
            .with_universe("", vec![asset("TSLA")], vec![ctx()])
            .with_book(book_from("TSLA", &[], &[("431.50", "5")]))
            .with_order_status(OrderStatus::Resting {
                order_id: 42,
                client_order_id: None,
            }),
    );
    let broker = broker_with(Arc::clone(&venue), signed_config()).await;

    let (_, receipt) = broker.place("TSLA", Side::Buy, d("3")).await.unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.legs[0].filled_size, Decimal::zero());
    assert_eq!(receipt.legs[0].order_id, Some(42));
}
