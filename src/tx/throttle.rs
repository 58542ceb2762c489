use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
    time::{Instant, sleep_until},
};

/// Request rate hosted RPC providers commonly allow on free tiers.
pub const PROVIDER_REQUESTS_PER_SECOND: u32 = 10;

/// Limits node requests issued through a [`super::TxPipeline`].
///
/// Clones share the same limit, so a single throttle can guard every
/// entity wrapper built from one pipeline.
#[derive(Clone, Debug, Default)]
pub enum Throttle {
    #[default]
    Unlimited,
    /// At most N requests in flight at once.
    InFlight(Arc<Semaphore>),
    /// Request starts spaced by at least the given interval.
    Rate(Arc<RateLimit>),
}

#[derive(Debug)]
pub struct RateLimit {
    interval: Duration,
    next: Mutex<Option<Instant>>,
}

/// Held for the duration of one request.
#[derive(Debug)]
pub struct ThrottlePermit(#[allow(dead_code)] Option<OwnedSemaphorePermit>);

impl Throttle {
    pub fn unlimited() -> Self {
        Self::Unlimited
    }

    pub fn max_in_flight(limit: usize) -> Self {
        Self::InFlight(Arc::new(Semaphore::new(limit.max(1))))
    }

    pub fn per_second(requests: u32) -> Self {
        let interval = Duration::from_secs(1) / requests.max(1);
        Self::Rate(Arc::new(RateLimit {
            interval,
            next: Mutex::new(None),
        }))
    }

    /// Waits until a request may start.
    pub async fn acquire(&self) -> ThrottlePermit {
        match self {
            Self::Unlimited => ThrottlePermit(None),
            Self::InFlight(semaphore) => {
                // The semaphore is never closed
                ThrottlePermit(semaphore.clone().acquire_owned().await.ok())
            }
            Self::Rate(limit) => {
                let start = {
                    let mut next = limit.next.lock().await;
                    let now = Instant::now();
                    let start = match *next {
                        Some(slot) if slot > now => slot,
                        _ => now,
                    };
                    *next = Some(start + limit.interval);
                    start
                };
                sleep_until(start).await;
                ThrottlePermit(None)
            }
        }
    }
}
