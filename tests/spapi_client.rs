use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use fba_wms::config;
use fba_wms::model::{LabelPrepType, PlanItem, PrepOwner, ProductCondition, ShipmentPlan};
use fba_wms::spapi::{
    Credentials, HttpTransport, RawResponse, SpApiClient, SpApiError, ACCESS_TOKEN_HEADER,
};

const TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";

#[derive(Debug, Clone)]
struct Call {
    url: String,
    token: Option<String>,
    body: Option<String>,
    started: Instant,
}

impl Call {
    fn is_refresh(&self) -> bool {
        self.url.starts_with(TOKEN_URL)
    }
}

/// Scripted transport: API calls and token refreshes each pop from their own
/// queue, falling back to an empty 200 once a queue runs dry.
#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    api: Mutex<VecDeque<RawResponse>>,
    token: Mutex<VecDeque<RawResponse>>,
    latency: Duration,
}

impl RecordingTransport {
    fn new(api: Vec<RawResponse>, token: Vec<RawResponse>) -> Self {
        Self {
            api: Mutex::new(api.into()),
            token: Mutex::new(token.into()),
            ..Self::default()
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn api_calls(&self) -> Vec<Call> {
        self.calls.lock().await.iter().filter(|c| !c.is_refresh()).cloned().collect()
    }

    async fn refresh_calls(&self) -> Vec<Call> {
        self.calls.lock().await.iter().filter(|c| c.is_refresh()).cloned().collect()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn execute(&self, request: reqwest::Request) -> Result<RawResponse, SpApiError> {
        let call = Call {
            url: request.url().to_string(),
            token: request
                .headers()
                .get(ACCESS_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned()),
            started: Instant::now(),
        };
        let queue = if call.is_refresh() { &self.token } else { &self.api };
        let response = queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| RawResponse::new(StatusCode::OK, "{}"));
        self.calls.lock().await.push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(response)
    }
}

fn spapi_config() -> config::SpApi {
    let cfg: config::Config = serde_yaml::from_str(config::example()).unwrap();
    cfg.spapi
}

fn client(transport: Arc<RecordingTransport>) -> SpApiClient {
    SpApiClient::with_transport(&spapi_config(), transport).unwrap()
}

fn seller(access_token: &str, refresh_token: Option<&str>) -> Credentials {
    Credentials {
        seller_id: "A1SELLER".into(),
        refresh_token: refresh_token.map(str::to_string),
        access_token: Some(access_token.to_string()),
        expires_at: None,
    }
}

fn unauthorized() -> RawResponse {
    RawResponse::new(StatusCode::UNAUTHORIZED, r#"{"errors":[{"code":"Unauthorized"}]}"#)
}

fn ok(body: serde_json::Value) -> RawResponse {
    RawResponse::new(StatusCode::OK, body.to_string())
}

fn fresh_token(token: &str) -> RawResponse {
    ok(json!({ "access_token": token, "token_type": "bearer", "expires_in": 3600 }))
}

#[tokio::test]
async fn refresh_without_refresh_token_makes_no_call() {
    let transport = Arc::new(RecordingTransport::default());
    let client = client(transport.clone());
    client.set_credentials(seller("stale", None)).await;

    let err = client.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, SpApiError::MissingRefreshToken));
    assert!(transport.calls.lock().await.is_empty());
}

#[tokio::test]
async fn unauthorized_without_refresh_token_fails_after_one_call() {
    let transport = Arc::new(RecordingTransport::new(vec![unauthorized()], vec![]));
    let client = client(transport.clone());
    client.set_credentials(seller("stale", None)).await;

    let err = client.get_report("R1").await.unwrap_err();
    assert!(matches!(err, SpApiError::MissingRefreshToken));
    assert_eq!(transport.calls.lock().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_then_success_replays_once_with_new_token() {
    let transport = Arc::new(RecordingTransport::new(
        vec![unauthorized(), ok(json!({ "processingStatus": "DONE" }))],
        vec![fresh_token("fresh")],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("stale", Some("Atzr|refresh"))).await;

    let body = client.get_report("R1").await.unwrap();
    assert_eq!(body["processingStatus"], "DONE");

    let api = transport.api_calls().await;
    assert_eq!(api.len(), 2);
    assert_eq!(api[0].token.as_deref(), Some("stale"));
    assert_eq!(api[1].token.as_deref(), Some("fresh"));
    assert_eq!(api[0].url, api[1].url);

    let refresh = transport.refresh_calls().await;
    assert_eq!(refresh.len(), 1);
    assert!(refresh[0].token.is_none());
    let form = refresh[0].body.as_deref().unwrap();
    assert!(form.contains("grant_type=refresh_token"));
    assert!(form.contains("refresh_token=Atzr%7Crefresh"));
    assert!(form.contains("client_id=amzn1.application-oa2-client.EXAMPLE"));

    let held = client.credentials().await;
    assert_eq!(held.access_token.as_deref(), Some("fresh"));
    assert!(held.expires_at.unwrap() > Utc::now());
}

#[tokio::test(start_paused = true)]
async fn second_unauthorized_is_not_retried_again() {
    let transport = Arc::new(RecordingTransport::new(
        vec![unauthorized(), unauthorized(), ok(json!({}))],
        vec![fresh_token("fresh")],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("stale", Some("refresh"))).await;

    let err = client.get_report("R1").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(transport.api_calls().await.len(), 2);
    assert_eq!(transport.refresh_calls().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_surfaces_without_replay() {
    let transport = Arc::new(RecordingTransport::new(
        vec![unauthorized()],
        vec![RawResponse::new(StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#)],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("stale", Some("revoked"))).await;

    let err = client.get_report("R1").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(transport.api_calls().await.len(), 1);
    assert_eq!(
        client.credentials().await.access_token.as_deref(),
        Some("stale")
    );
}

#[tokio::test]
async fn unrepresentable_token_lifetime_is_an_error() {
    let transport = Arc::new(RecordingTransport::new(
        vec![],
        vec![ok(json!({ "access_token": "x", "expires_in": 9_000_000_000_000i64 }))],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("stale", Some("refresh"))).await;

    let err = client.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, SpApiError::InvalidTokenResponse(_)));
    assert_eq!(
        client.credentials().await.access_token.as_deref(),
        Some("stale")
    );
}

#[tokio::test(start_paused = true)]
async fn back_to_back_calls_start_at_least_the_interval_apart() {
    let transport = Arc::new(RecordingTransport::default());
    let client = client(transport.clone());
    client.set_credentials(seller("token", Some("refresh"))).await;

    client.get_report("R1").await.unwrap();
    client.get_report("R2").await.unwrap();
    let (a, b) = tokio::join!(client.get_report("R3"), client.get_report("R4"));
    a.unwrap();
    b.unwrap();

    let calls = transport.api_calls().await;
    assert_eq!(calls.len(), 4);
    for pair in calls.windows(2) {
        assert!(pair[1].started - pair[0].started >= Duration::from_millis(500));
    }
}

#[tokio::test(start_paused = true)]
async fn report_download_is_paced_and_sends_no_token() {
    let transport = Arc::new(RecordingTransport::new(
        vec![ok(json!({})), RawResponse::new(StatusCode::OK, "sku\tqty\nA-1\t4\n")],
        vec![],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("token", Some("refresh"))).await;

    client.get_report_document("DOC-1").await.unwrap();
    let contents = client
        .download_report("https://tortuga-prod-na.s3.amazonaws.com/doc")
        .await
        .unwrap();
    assert_eq!(contents, "sku\tqty\nA-1\t4\n");

    let calls = transport.api_calls().await;
    assert_eq!(calls[0].token.as_deref(), Some("token"));
    assert!(calls[1].token.is_none());
    assert!(calls[1].started - calls[0].started >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn concurrent_rejections_share_one_refresh() {
    // Latency above the pacing interval lets the second call go out with the
    // stale token before the first call's refresh completes.
    let transport = Arc::new(
        RecordingTransport::new(
            vec![
                unauthorized(),
                unauthorized(),
                ok(json!({ "n": 1 })),
                ok(json!({ "n": 2 })),
            ],
            vec![fresh_token("fresh"), fresh_token("fresher")],
        )
        .with_latency(Duration::from_millis(600)),
    );
    let client = client(transport.clone());
    client.set_credentials(seller("stale", Some("refresh"))).await;

    let (a, b) = tokio::join!(client.get_report("R1"), client.get_report("R2"));
    a.unwrap();
    b.unwrap();

    assert_eq!(transport.refresh_calls().await.len(), 1);
    let api = transport.api_calls().await;
    assert_eq!(api.len(), 4);
    assert_eq!(api[0].token.as_deref(), Some("stale"));
    assert_eq!(api[1].token.as_deref(), Some("stale"));
    assert!(api[2..].iter().all(|c| c.token.as_deref() == Some("fresh")));
}

fn plan(skus: &[&str]) -> ShipmentPlan {
    let now = Utc::now();
    ShipmentPlan {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Spring restock".into(),
        ship_from_address_id: None,
        label_prep_type: LabelPrepType::SellerLabel,
        items: skus
            .iter()
            .map(|sku| PlanItem {
                sku: sku.to_string(),
                asin: None,
                condition: ProductCondition::NewItem,
                quantity: 12,
                prep_owner: PrepOwner::Seller,
            })
            .collect(),
        is_valid: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test(start_paused = true)]
async fn plan_validation_stops_at_first_item_with_errors() {
    let transport = Arc::new(RecordingTransport::new(
        vec![
            ok(json!({ "payload": { "SKUPrepInstructionsList": [] } })),
            ok(json!({ "errors": [{ "code": "InvalidInput", "message": "bad sku" }] })),
            ok(json!({ "payload": {} })),
        ],
        vec![],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("token", Some("refresh"))).await;

    let valid = client
        .validate_shipment_plan(&plan(&["A-1", "B-2", "C-3"]), "US")
        .await
        .unwrap();
    assert!(!valid);

    let calls = transport.api_calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls[0].url.contains("ShipToCountryCode=US"));
    assert!(calls[1].url.contains("SellerSKUList=B-2"));
}

#[tokio::test(start_paused = true)]
async fn plan_validation_passes_when_every_item_is_clean() {
    let transport = Arc::new(RecordingTransport::new(
        vec![ok(json!({ "payload": {} })), ok(json!({ "errors": [] }))],
        vec![],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("token", Some("refresh"))).await;

    assert!(client
        .validate_shipment_plan(&plan(&["A-1", "B-2"]), "US")
        .await
        .unwrap());
    assert_eq!(transport.api_calls().await.len(), 2);

    assert!(client.validate_shipment_plan(&plan(&[]), "US").await.unwrap());
    assert_eq!(transport.api_calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn import_maps_catalog_item_onto_product_draft() {
    let transport = Arc::new(RecordingTransport::new(
        vec![ok(json!({
            "asin": "B000TEST01",
            "summaries": [{
                "marketplaceId": "ATVPDKIKX0DER",
                "itemName": "Stainless Water Bottle",
                "brand": "Hydra"
            }],
            "images": [{
                "marketplaceId": "ATVPDKIKX0DER",
                "images": [
                    { "variant": "PT01", "link": "https://m.media-amazon.com/pt01.jpg" },
                    { "variant": "MAIN", "link": "https://m.media-amazon.com/main.jpg" }
                ]
            }]
        }))],
        vec![],
    ));
    let client = client(transport.clone());
    client.set_credentials(seller("token", Some("refresh"))).await;

    let draft = client
        .import_product_from_amazon("B000TEST01", "ATVPDKIKX0DER")
        .await
        .unwrap();
    assert_eq!(draft.asin, "B000TEST01");
    assert_eq!(draft.title, "Stainless Water Bottle");
    assert_eq!(draft.brand.as_deref(), Some("Hydra"));
    assert_eq!(
        draft.image_url.as_deref(),
        Some("https://m.media-amazon.com/main.jpg")
    );

    let calls = transport.api_calls().await;
    assert!(calls[0].url.contains("/catalog/2022-04-01/items/B000TEST01"));
    assert!(calls[0].url.contains("marketplaceIds=ATVPDKIKX0DER"));
}
