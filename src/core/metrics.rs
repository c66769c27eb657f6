//! Per-agent operation counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// Live counters for one agent. Cheap to bump from any request path.
#[derive(Debug, Default)]
pub struct AgentCounters {
    stt_requests: AtomicU64,
    stt_failures: AtomicU64,
    stt_cache_hits: AtomicU64,
    tts_requests: AtomicU64,
    tts_failures: AtomicU64,
    intent_checks: AtomicU64,
    rate_limit_rejections: AtomicU64,
}

/// Snapshot of one agent's counters, as served on the metrics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub stt_requests: u64,
    pub stt_failures: u64,
    pub stt_cache_hits: u64,
    pub tts_requests: u64,
    pub tts_failures: u64,
    pub intent_checks: u64,
    pub rate_limit_rejections: u64,
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    agents: DashMap<String, Arc<AgentCounters>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent(&self, agent_id: &str) -> Arc<AgentCounters> {
        self.agents
            .entry(agent_id.to_string())
            .or_default()
            .clone()
    }

    pub fn record_stt_request(&self, agent_id: &str) {
        self.agent(agent_id).stt_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stt_failure(&self, agent_id: &str) {
        self.agent(agent_id).stt_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stt_cache_hit(&self, agent_id: &str) {
        self.agent(agent_id).stt_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tts_request(&self, agent_id: &str) {
        self.agent(agent_id).tts_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tts_failure(&self, agent_id: &str) {
        self.agent(agent_id).tts_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_intent_check(&self, agent_id: &str) {
        self.agent(agent_id).intent_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_rejection(&self, agent_id: &str) {
        self.agent(agent_id)
            .rate_limit_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, agent_id: &str) -> MetricsSnapshot {
        let counters = self.agent(agent_id);
        MetricsSnapshot {
            stt_requests: counters.stt_requests.load(Ordering::Relaxed),
            stt_failures: counters.stt_failures.load(Ordering::Relaxed),
            stt_cache_hits: counters.stt_cache_hits.load(Ordering::Relaxed),
            tts_requests: counters.tts_requests.load(Ordering::Relaxed),
            tts_failures: counters.tts_failures.load(Ordering::Relaxed),
            intent_checks: counters.intent_checks.load(Ordering::Relaxed),
            rate_limit_rejections: counters.rate_limit_rejections.load(Ordering::Relaxed),
        }
    }
}
