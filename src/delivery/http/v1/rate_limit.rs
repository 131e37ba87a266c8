use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;
use crate::usecase::error::UsecaseError;

const MAX_TRACKED_CLIENTS: usize = 10_000;

/// Sliding-window request counter per client address.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    trusted_proxy_hops: usize,
    hits: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            trusted_proxy_hops: 0,
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of reverse proxies in front of the service whose
    /// `X-Forwarded-For` entries are trusted. Zero keys on the socket peer.
    pub fn trust_proxy_hops(mut self, hops: usize) -> Self {
        self.trusted_proxy_hops = hops;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Records a request. `None` when the window is full, else the requests left.
    pub fn check(&self, ip: IpAddr) -> Option<u32> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Option<u32> {
        let cutoff = now.checked_sub(self.window);
        let expired = |at: &Instant| cutoff.is_some_and(|cutoff| *at <= cutoff);

        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamps = hits.entry(ip).or_default();
        while timestamps.front().is_some_and(expired) {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests as usize {
            return None;
        }
        timestamps.push_back(now);
        let remaining = self.max_requests - timestamps.len() as u32;

        if hits.len() > MAX_TRACKED_CLIENTS {
            hits.retain(|_, timestamps| timestamps.back().is_some_and(|at| !expired(at)));
        }
        Some(remaining)
    }
}

/// The socket peer, or with `trusted_hops` proxies in front, the address
/// that many hops back along `X-Forwarded-For`. Entries left of that point
/// are client-controlled and ignored.
fn client_ip(request: &Request, trusted_hops: usize) -> IpAddr {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    if trusted_hops == 0 {
        return peer;
    }

    let forwarded: Vec<&str> = request
        .headers()
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .collect();

    // The peer is the last trusted proxy; each further hop reads one entry from the right.
    forwarded
        .len()
        .checked_sub(trusted_hops)
        .and_then(|index| forwarded.get(index))
        .or_else(|| forwarded.first())
        .and_then(|ip| ip.parse().ok())
        .unwrap_or(peer)
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, UsecaseError> {
    let limiter = &state.rate_limiter;
    let ip = client_ip(&request, limiter.trusted_proxy_hops);

    let Some(remaining) = limiter.check(ip) else {
        metrics::counter!("rate_limited_requests_total").increment(1);
        tracing::warn!(%ip, "rate limit exceeded");
        return Err(UsecaseError::RateLimited(
            "Too many requests from this IP, please try again in an hour!".to_string(),
        ));
    };

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.max_requests()));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
    Ok(response)
}
