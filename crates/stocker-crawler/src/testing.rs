//! Test doubles: an in-memory market-data provider, a counting notifier and
//! a routed HTTP stub standing in for the upstream API or the storage gateway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, FixedOffset, NaiveDate};

use stocker_core::config::{HistoryConfig, TablesConfig};
use stocker_core::error::{Result, StockerError};
use stocker_hbase::codec;
use stocker_hbase::{HBaseClientFactory, Row};

use crate::calendar::FixedClock;
use crate::models::{StockDailyStatisticsInfo, StockRealtimeInfo};
use crate::notifier::PredictorNotifier;
use crate::provider::StockInfoProvider;
use crate::tasks::CrawlerContext;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            location: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            location: None,
        }
    }

    pub fn created(location: impl Into<String>) -> Self {
        Self {
            status: 201,
            body: String::new(),
            location: Some(location.into()),
        }
    }
}

type Route = Arc<dyn Fn(&Recorded) -> Reply + Send + Sync>;

#[derive(Clone)]
struct StubState {
    route: Route,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// HTTP stub whose answers come from a routing closure.
pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub async fn start<F>(route: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            route: Arc::new(route),
            requests: requests.clone(),
        };
        let app = Router::new().fallback(handle).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

async fn handle(State(state): State<StubState>, method: Method, uri: Uri, body: Bytes) -> Response {
    let request = Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        body: body.to_vec(),
    };
    let reply = (state.route)(&request);
    state.requests.lock().unwrap().push(request);

    let status = StatusCode::from_u16(reply.status).unwrap();
    let mut response = (status, reply.body).into_response();
    if let Some(location) = reply.location {
        response
            .headers_mut()
            .insert(header::LOCATION, HeaderValue::from_str(&location).unwrap());
    }
    response
}

/// Gateway stub for a table whose scanner returns `stored` row keys once,
/// then reports exhaustion. Every other write succeeds.
pub async fn gateway_with_stored_keys(table: &str, stored: Vec<String>) -> StubServer {
    let scanner_path = format!("/{table}/scanner");
    let page_path = format!("/{table}/scanner/1");
    let pages = Arc::new(AtomicUsize::new(0));
    StubServer::start(move |req| {
        if req.method == "PUT" && req.path == scanner_path {
            return Reply::created(page_path.clone());
        }
        if req.method == "GET" && req.path == page_path {
            if pages.fetch_add(1, Ordering::SeqCst) > 0 || stored.is_empty() {
                return Reply::status(204);
            }
            let rows: Vec<Row> = stored.iter().map(Row::new).collect();
            let body = codec::encode_rows(&rows).unwrap();
            return Reply::ok(String::from_utf8(body).unwrap());
        }
        Reply::status(200)
    })
    .await
}

/// In-memory provider with canned answers.
#[derive(Default)]
pub struct FakeProvider {
    pub realtime: Vec<StockRealtimeInfo>,
    pub daily: HashMap<String, Vec<StockDailyStatisticsInfo>>,
    pub daily_calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    /// Fail every daily statistics call as if the upstream were unreachable.
    pub daily_down: bool,
}

#[async_trait]
impl StockInfoProvider for FakeProvider {
    async fn realtime_stocks(&self) -> Result<Vec<StockRealtimeInfo>> {
        Ok(self.realtime.clone())
    }

    async fn daily_statistics(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<StockDailyStatisticsInfo>> {
        self.daily_calls
            .lock()
            .unwrap()
            .push((code.to_string(), start, end));
        if self.daily_down {
            return Err(StockerError::Transport("connection refused".into()));
        }
        Ok(self
            .daily
            .get(code)
            .map(|days| {
                days.iter()
                    .filter(|d| d.date >= start && d.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PredictorNotifier for CountingNotifier {
    async fn notify(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn quote(code: &str, name: &str, price: f64) -> StockRealtimeInfo {
    StockRealtimeInfo {
        code: code.into(),
        name: name.into(),
        market_cap: 0.0,
        current_price: price,
        open_price: price,
        settlement_price: price,
        highest_price: price,
        lowest_price: price,
        change_percent: 0.0,
        turnover_ratio: 0.0,
        volume: 0,
        amount: 0.0,
    }
}

pub fn day(code: &str, date: NaiveDate, close: f64) -> StockDailyStatisticsInfo {
    StockDailyStatisticsInfo {
        code: code.into(),
        open_price: close - 0.5,
        close_price: close,
        highest_price: close + 1.0,
        lowest_price: close - 1.0,
        date,
        volume: 1000,
    }
}

pub fn context_for(provider: Arc<FakeProvider>, gateway: &str, now: DateTime<FixedOffset>) -> CrawlerContext {
    context_with_notifier(provider, gateway, now, Arc::new(CountingNotifier::default()))
}

pub fn context_with_notifier(
    provider: Arc<FakeProvider>,
    gateway: &str,
    now: DateTime<FixedOffset>,
    notifier: Arc<CountingNotifier>,
) -> CrawlerContext {
    CrawlerContext {
        provider,
        hbase: HBaseClientFactory::new(gateway, Duration::from_secs(5)).unwrap(),
        notifier,
        clock: Arc::new(FixedClock(now)),
        tables: TablesConfig::default(),
        history: HistoryConfig::default(),
        producers: 3,
        queue_capacity: 2,
    }
}
