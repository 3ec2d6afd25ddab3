//! Router over the real LI.FI and CCTP adapters, served by a mock HTTP server

use alloy_primitives::{Address, I256};
use httpmock::prelude::*;
use serde_json::json;
use usdc_router::{Amount, ErrorKind, Router, RouterBuilder, RouteRequest, Settings};

const USDC_ETH: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const USDC_BASE: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";

fn router(server: &MockServer) -> Router {
	let mut settings = Settings::default();
	settings.providers.lifi.base_url = server.base_url();
	settings.providers.cctp.base_url = server.base_url();
	RouterBuilder::from_config(settings)
		.build()
		.expect("router should build")
}

fn request(units: u64) -> RouteRequest {
	RouteRequest::new(
		1,
		8453,
		"USDC",
		I256::try_from(units).unwrap(),
		Address::repeat_byte(0x11),
	)
}

fn lifi_route() -> serde_json::Value {
	json!({
		"id": "lifi-route-1",
		"fromChainId": 1,
		"toChainId": 8453,
		"fromAmount": "5000000",
		"toAmount": "4990000",
		"toAmountMin": "4965050",
		"gasCostUSD": "1.25",
		"steps": [{
			"id": "step-1",
			"type": "cross",
			"tool": "stargate",
			"action": {
				"fromChainId": 1,
				"toChainId": 8453,
				"fromAmount": "5000000",
				"fromToken": {"address": USDC_ETH},
				"toToken": {"address": USDC_BASE}
			},
			"estimate": {
				"toAmount": "4990000",
				"toAmountMin": "4965050",
				"executionDuration": 95,
				"gasCosts": [{"amountUSD": "1.25"}]
			}
		}],
		"tags": ["RECOMMENDED"]
	})
}

#[tokio::test]
async fn test_resolve_routes_through_http_adapters() {
	let server = MockServer::start_async().await;
	let lifi = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/advanced/routes")
				.json_body_partial(r#"{"fromChainId":1,"toChainId":8453,"fromAmount":"5000000"}"#);
			then.status(200).json_body(json!({"routes": [lifi_route()]}));
		})
		.await;
	let fees = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/burn/USDC/fees/0/6");
			then.status(200).json_body(json!([
				{"finalityThreshold": 1000, "minimumFee": 1},
				{"finalityThreshold": 2000, "minimumFee": 0}
			]));
		})
		.await;

	let router = router(&server);
	let set = router.routes.resolve_routes(&request(5_000_000)).await.unwrap();
	lifi.assert_async().await;
	fees.assert_async().await;

	let ids: Vec<&str> = set.routes.iter().map(|r| r.id.as_str()).collect();
	assert_eq!(
		ids,
		vec!["cctp-standard-1-8453-2000", "cctp-fast-1-8453-1000", "lifi-route-1"]
	);
	assert_eq!(set.routes[1].to_amount, Amount::from(4_999_500u64));
	assert_eq!(set.routes[2].provider, "lifi");
	assert_eq!(set.routes[2].to_amount_min, Amount::from(4_965_050u64));
	assert!(set.routes[1].has_tag("FASTEST"));
}

#[tokio::test]
async fn test_rate_limited_provider_alongside_working_one() {
	let server = MockServer::start_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/advanced/routes");
			then.status(429).body("Too Many Requests");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/burn/USDC/fees/0/6");
			then.status(200)
				.json_body(json!([{"finalityThreshold": 2000, "minimumFee": 0}]));
		})
		.await;

	let router = router(&server);
	let set = router.routes.resolve_routes(&request(5_000_000)).await.unwrap();
	assert_eq!(set.routes.len(), 1);
	assert_eq!(set.routes[0].provider, "cctp");
}

#[tokio::test]
async fn test_every_provider_failing_is_classified() {
	let server = MockServer::start_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/advanced/routes");
			then.status(429).body("Too Many Requests");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/burn/USDC/fees/0/6");
			then.status(429).body("rate limit exceeded");
		})
		.await;

	let router = router(&server);
	let err = router
		.routes
		.resolve_routes(&request(5_000_000))
		.await
		.unwrap_err();
	assert_eq!(err.to_bridge_error().code, ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_cctp_fee_tiers_for_amount() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/burn/USDC/fees/3/2");
			then.status(200).json_body(json!([
				{"finalityThreshold": 1000, "minimumFee": 1.3},
				{"finalityThreshold": 2000, "minimumFee": 0}
			]));
		})
		.await;

	let router = router(&server);
	// Arbitrum -> Optimism
	let fees = router.cctp.fetch_fees(42161, 10).await.unwrap();
	mock.assert_async().await;

	let fast = fees.iter().find(|f| f.is_fast()).unwrap();
	assert_eq!(fast.minimum_fee_centi_bps, 130);
	// 1.3 bps of 1000 USDC
	assert_eq!(
		fast.fee_for(Amount::from(1_000_000_000u64)),
		Some(Amount::from(130_000u64))
	);
}
