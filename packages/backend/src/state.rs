use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::RwLock;

use carimpact_analytics::{
    ImpactRequest, ImpactResponse, ObservedSeriesProvider, SyntheticProfile,
    SyntheticSalesProvider,
};

#[derive(Debug, Clone, Serialize)]
pub struct Dealer {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub integration_date: NaiveDate,
}

/// One analysis request, keyed for the result cache. The computation is a
/// pure function of these fields, so a hit can never be stale. Monetary
/// multipliers are keyed by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dealer_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    intervention: NaiveDate,
    order_value_bits: u64,
    margin_bits: u64,
}

impl CacheKey {
    fn from_request(request: &ImpactRequest) -> Self {
        Self {
            dealer_id: request.dealer_id,
            start: request.start_date,
            end: request.end_date,
            intervention: request.intervention_date,
            order_value_bits: request.average_order_value.to_bits(),
            margin_bits: request.average_margin.to_bits(),
        }
    }
}

/// Cache keys are user-supplied, so the cache must not grow with every
/// distinct parameter combination a client tries.
const MAX_CACHED_RESPONSES: usize = 128;

/// Insertion-ordered response cache; past the cap the oldest entry goes.
struct ResponseCache {
    entries: HashMap<CacheKey, Arc<ImpactResponse>>,
    order: VecDeque<CacheKey>,
}

impl ResponseCache {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<ImpactResponse>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: CacheKey, response: Arc<ImpactResponse>) {
        if self.entries.insert(key.clone(), response).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > MAX_CACHED_RESPONSES {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    dealers: HashMap<i64, Dealer>,
    provider: Arc<dyn ObservedSeriesProvider>,
    cache: RwLock<ResponseCache>,
    started_at: Instant,
}

impl AppState {
    /// Demo registry and a seeded synthetic series provider.
    pub fn new(demo_seed: u64) -> Self {
        let mut provider = SyntheticSalesProvider::new(demo_seed);
        let mut dealers = HashMap::new();
        for (dealer, profile) in demo_dealers() {
            provider = provider.with_dealer(dealer.id, profile);
            dealers.insert(dealer.id, dealer);
        }
        Self::with_provider(dealers, Arc::new(provider))
    }

    /// Seam for swapping in another observed-series source.
    pub fn with_provider(
        dealers: HashMap<i64, Dealer>,
        provider: Arc<dyn ObservedSeriesProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                dealers,
                provider,
                cache: RwLock::new(ResponseCache::new()),
                started_at: Instant::now(),
            }),
        }
    }

    pub fn dealer(&self, dealer_id: i64) -> Option<Dealer> {
        self.inner.dealers.get(&dealer_id).cloned()
    }

    pub fn provider(&self) -> &dyn ObservedSeriesProvider {
        self.inner.provider.as_ref()
    }

    pub async fn cached_response(&self, request: &ImpactRequest) -> Option<Arc<ImpactResponse>> {
        let key = CacheKey::from_request(request);
        self.inner.cache.read().await.get(&key)
    }

    pub async fn store_response(
        &self,
        request: &ImpactRequest,
        response: ImpactResponse,
    ) -> Arc<ImpactResponse> {
        let key = CacheKey::from_request(request);
        let shared = Arc::new(response);
        self.inner
            .cache
            .write()
            .await
            .insert(key, Arc::clone(&shared));
        shared
    }

    pub async fn cached_analyses(&self) -> usize {
        self.inner.cache.read().await.len()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}

fn demo_dealers() -> Vec<(Dealer, SyntheticProfile)> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid demo date");
    vec![
        (
            Dealer {
                id: 1,
                name: "Skyline Motors".to_string(),
                city: "Los Angeles".to_string(),
                state: "CA".to_string(),
                integration_date: date(2025, 2, 10),
            },
            SyntheticProfile {
                base_daily_sales: 20.0,
                weekend_boost: 8.0,
                noise_amplitude: 3.0,
                integration_date: date(2025, 2, 10),
                lift_daily_sales: 6.0,
            },
        ),
        (
            Dealer {
                id: 2,
                name: "Lakeview Auto Group".to_string(),
                city: "Chicago".to_string(),
                state: "IL".to_string(),
                integration_date: date(2025, 3, 1),
            },
            SyntheticProfile {
                base_daily_sales: 12.0,
                weekend_boost: 5.0,
                noise_amplitude: 2.0,
                integration_date: date(2025, 3, 1),
                lift_daily_sales: 4.0,
            },
        ),
        (
            Dealer {
                id: 3,
                name: "Summit Auto Mall".to_string(),
                city: "Denver".to_string(),
                state: "CO".to_string(),
                integration_date: date(2025, 1, 20),
            },
            SyntheticProfile {
                base_daily_sales: 30.0,
                weekend_boost: 10.0,
                noise_amplitude: 4.0,
                integration_date: date(2025, 1, 20),
                lift_daily_sales: 8.0,
            },
        ),
    ]
}
