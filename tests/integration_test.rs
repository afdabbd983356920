//! End-to-end tests against a running wattflow instance.
//!
//! These drive the real HTTP surface (ingest, query, summary, device list)
//! with `reqwest`, pointed at `BASE_URL` (default `http://localhost:8080`).
//! They are `#[ignore]`d because they need a live server with a reachable
//! PostgreSQL behind it:
//!
//! ```sh
//! cargo run &
//! cargo test -- --ignored
//! ```
//!
//! Each test mints a unique device id so runs never interfere with each
//! other or with previously ingested data.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

// ---

#[derive(Debug, Deserialize)]
struct IngestAck {
    status: String,
    measurement_id: i32,
}

#[derive(Debug, Deserialize)]
struct MeasurementOut {
    id: i32,
    device_id: String,
    voltage: f64,
    current: f64,
    power: f64,
    energy: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SummaryOut {
    device_id: String,
    latest_power: f64,
    latest_energy: f64,
    daily_energy: f64,
    daily_cost: f64,
}

#[derive(Debug, Deserialize)]
struct DeviceOut {
    id: i32,
    device_id: String,
    name: Option<String>,
}

// ---

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

fn unique_device_id(tag: &str) -> String {
    format!(
        "it-{}-{}",
        tag,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn ingest(
    client: &Client,
    device_id: &str,
    voltage: f64,
    current: f64,
    power: f64,
    energy: f64,
    timestamp: Option<DateTime<Utc>>,
) -> Result<IngestAck> {
    // ---
    let mut body = json!({
        "device_id": device_id,
        "voltage": voltage,
        "current": current,
        "power": power,
        "energy": energy,
    });
    if let Some(ts) = timestamp {
        body["timestamp"] = json!(ts.to_rfc3339());
    }

    let response = client
        .post(format!("{}/api/measurements", base_url()))
        .json(&body)
        .send()
        .await?;

    assert_eq!(response.status(), 201, "ingest should answer 201 Created");
    Ok(response.json().await?)
}

// ---

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn ingest_then_summary_reports_latest_and_daily() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("summary");

    // Two samples "today": 10 Wh @ 240 W, then 5 Wh @ 230 W
    let ack = ingest(&client, &device_id, 120.0, 2.0, 240.0, 10.0, None).await?;
    assert_eq!(ack.status, "ok");
    assert!(ack.measurement_id > 0);

    let ack2 = ingest(&client, &device_id, 121.0, 1.9, 230.0, 5.0, None).await?;
    assert!(ack2.measurement_id > ack.measurement_id);

    let summary: SummaryOut = client
        .get(format!("{}/api/devices/{}/summary", base_url(), device_id))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(summary.device_id, device_id);
    assert_eq!(summary.latest_power, 230.0);
    assert_eq!(summary.latest_energy, 5.0);
    assert!(
        (summary.daily_energy - 15.0).abs() < 1e-9,
        "daily total should be the sum of today's energy values, got {}",
        summary.daily_energy
    );
    assert_eq!(summary.daily_cost, 0.0, "cost is a stub until tariffs exist");

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn summary_for_unknown_device_is_404() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("ghost");

    // Never ingested anything for this id
    let response = client
        .get(format!("{}/api/devices/{}/summary", base_url(), device_id))
        .send()
        .await?;

    assert_eq!(
        response.status(),
        404,
        "unknown device must be an error, not a zero-valued summary"
    );
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn pagination_covers_all_records_without_overlap() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("page");

    // Four samples one minute apart, well inside today
    let base_ts = Utc::now() - Duration::minutes(10);
    for i in 0..4 {
        let ts = base_ts + Duration::minutes(i);
        ingest(&client, &device_id, 120.0, 1.0, 120.0, 1.0, Some(ts)).await?;
    }

    let page = |skip: u32| {
        client
            .get(format!(
                "{}/api/measurements?device_id={}&skip={}&limit=2",
                base_url(),
                device_id,
                skip
            ))
            .send()
    };

    let first: Vec<MeasurementOut> = page(0).await?.json().await?;
    let second: Vec<MeasurementOut> = page(2).await?.json().await?;
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    let all: Vec<&MeasurementOut> = first.iter().chain(second.iter()).collect();

    // Newest first across the page boundary, no overlap or omission
    let mut ids: Vec<i32> = all.iter().map(|m| m.id).collect();
    for pair in all.windows(2) {
        assert!(pair[0].timestamp > pair[1].timestamp, "must be newest-first");
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "each record appears exactly once");

    for m in &all {
        assert_eq!(m.device_id, device_id);
        assert_eq!(m.voltage, 120.0);
        assert_eq!(m.current, 1.0);
        assert_eq!(m.power, 120.0);
        assert_eq!(m.energy, 1.0);
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn time_window_filter_bounds_are_inclusive() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("window");

    let t0 = Utc::now() - Duration::minutes(30);
    let t1 = t0 + Duration::minutes(10);
    let t2 = t0 + Duration::minutes(20);
    for ts in [t0, t1, t2] {
        ingest(&client, &device_id, 120.0, 1.0, 120.0, 2.0, Some(ts)).await?;
    }

    let url = format!(
        "{}/api/measurements?device_id={}&start={}&end={}",
        base_url(),
        device_id,
        urlencode(&t0.to_rfc3339()),
        urlencode(&t1.to_rfc3339()),
    );
    let rows: Vec<MeasurementOut> = client.get(&url).send().await?.json().await?;

    assert_eq!(rows.len(), 2, "both boundary records must be included");
    assert_eq!(rows[0].timestamp, t1);
    assert_eq!(rows[1].timestamp, t0);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn device_is_registered_on_first_measurement() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("register");

    ingest(&client, &device_id, 120.0, 1.0, 120.0, 1.0, None).await?;

    let devices: Vec<DeviceOut> = client
        .get(format!("{}/api/devices", base_url()))
        .send()
        .await?
        .json()
        .await?;

    let created: Vec<&DeviceOut> = devices
        .iter()
        .filter(|d| d.device_id == device_id)
        .collect();
    assert_eq!(created.len(), 1, "exactly one registry row per device id");
    assert!(created[0].id > 0);
    assert!(created[0].name.is_none());

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn concurrent_first_sight_creates_exactly_one_device() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("race");

    // Eight simultaneous ingests, all naming the same unseen device id.
    // Whichever request wins the registry insert, the rest must resolve to
    // the winner's row instead of creating duplicates.
    let ingests =
        (0..8).map(|i| ingest(&client, &device_id, 120.0, 1.0, 120.0, 1.0 + i as f64, None));
    let acks = futures::future::join_all(ingests).await;

    let mut measurement_ids: Vec<i32> = Vec::new();
    for ack in acks {
        let ack = ack?;
        assert_eq!(ack.status, "ok");
        measurement_ids.push(ack.measurement_id);
    }
    measurement_ids.sort_unstable();
    measurement_ids.dedup();
    assert_eq!(
        measurement_ids.len(),
        8,
        "every concurrent ingest must be accepted with its own measurement"
    );

    let devices: Vec<DeviceOut> = client
        .get(format!("{}/api/devices", base_url()))
        .send()
        .await?
        .json()
        .await?;
    let created: Vec<&DeviceOut> = devices
        .iter()
        .filter(|d| d.device_id == device_id)
        .collect();
    assert_eq!(
        created.len(),
        1,
        "concurrent first-sight must resolve to a single registry row"
    );

    // All eight measurements landed under that one device
    let rows: Vec<MeasurementOut> = client
        .get(format!(
            "{}/api/measurements?device_id={}",
            base_url(),
            device_id
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(rows.len(), 8);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn out_of_order_ingestion_yields_same_summary() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("ooo");

    // The later-timestamped sample arrives first
    let now = Utc::now();
    let earlier = now - Duration::minutes(20);
    let later = now - Duration::minutes(5);
    ingest(&client, &device_id, 121.0, 1.9, 230.0, 5.0, Some(later)).await?;
    ingest(&client, &device_id, 120.0, 2.0, 240.0, 10.0, Some(earlier)).await?;

    let summary: SummaryOut = client
        .get(format!("{}/api/devices/{}/summary", base_url(), device_id))
        .send()
        .await?
        .json()
        .await?;

    // "Latest" means latest by timestamp, not by arrival
    assert_eq!(summary.latest_power, 230.0);
    assert_eq!(summary.latest_energy, 5.0);
    assert!(
        (summary.daily_energy - 15.0).abs() < 1e-9,
        "daily total must not depend on ingestion order, got {}",
        summary.daily_energy
    );

    // History is still served newest-first by timestamp
    let rows: Vec<MeasurementOut> = client
        .get(format!(
            "{}/api/measurements?device_id={}",
            base_url(),
            device_id
        ))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, later);
    assert_eq!(rows[1].timestamp, earlier);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running server and database"]
async fn malformed_payload_is_rejected_before_the_pipeline() -> Result<()> {
    // ---
    let client = Client::new();
    let device_id = unique_device_id("malformed");

    // Missing the required `energy` field
    let response = client
        .post(format!("{}/api/measurements", base_url()))
        .json(&json!({
            "device_id": device_id,
            "voltage": 120.0,
            "current": 2.0,
            "power": 240.0,
        }))
        .send()
        .await?;
    assert!(
        response.status().is_client_error(),
        "incomplete sample must be rejected, got {}",
        response.status()
    );

    // Nothing was persisted and no device was created
    let r = client
        .get(format!("{}/api/devices/{}/summary", base_url(), device_id))
        .send()
        .await?;
    assert_eq!(r.status(), 404);

    Ok(())
}

// ---

/// Minimal percent-encoding for RFC 3339 timestamps in query strings
/// (`+` and `:` are the only characters that need care here).
fn urlencode(value: &str) -> String {
    // ---
    value.replace('+', "%2B").replace(':', "%3A")
}
