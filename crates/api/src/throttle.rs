use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Sliding-window request counter keyed by client.
#[derive(Debug, Clone)]
pub struct RequestThrottle {
    state: Arc<Mutex<ThrottleState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug, Default)]
struct ThrottleState {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl RequestThrottle {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ThrottleState::default())),
            window,
            max_requests,
        }
    }

    pub fn check(&self, client: &str) -> ThrottleDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> ThrottleDecision {
        let mut state = self.state.lock();
        self.sweep_idle_clients(&mut state, now);

        let queue = state.hits.entry(client.to_string()).or_default();
        while let Some(oldest) = queue.front() {
            if now.duration_since(*oldest) >= self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            if queue.is_empty() {
                state.hits.remove(client);
            }
            return ThrottleDecision::Limited { retry_after };
        }

        queue.push_back(now);
        ThrottleDecision::Allowed
    }

    /// Drops clients whose newest hit is older than the window. Runs at most
    /// once per window so the cost stays amortized.
    fn sweep_idle_clients(&self, state: &mut ThrottleState, now: Instant) {
        let due = state
            .last_sweep
            .map_or(true, |last| now.duration_since(last) >= self.window);
        if !due {
            return;
        }

        let window = self.window;
        state.hits.retain(|_, queue| {
            queue
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < window)
        });
        state.last_sweep = Some(now);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state.lock().hits.len()
    }
}
