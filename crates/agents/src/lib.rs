use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use publicsphere_core::{
    welcome_payload, ChatInput, ChatReply, IntentResponder, MessageRecord, Resolution,
    ResponsePayload, Role, ScenarioId,
};
use publicsphere_observability::AppMetrics;
use publicsphere_storage::{TranscriptKey, TranscriptRepository};
use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const HOME_SCENARIO: &str = "home";

/// Artificial think time applied before every answer so the widget's typing
/// indicator has something to show. Half-open range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    min: Duration,
    max: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self::from_millis(400, 800)
    }
}

impl LatencyProfile {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if max_ms < min_ms {
            (max_ms, min_ms)
        } else {
            (min_ms, max_ms)
        };
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    pub fn instant() -> Self {
        Self::from_millis(0, 0)
    }

    pub fn sample(&self) -> Duration {
        let span = self.max.saturating_sub(self.min).as_millis() as u64;
        if span == 0 {
            return self.min;
        }
        self.min + Duration::from_millis(rand::rng().random_range(0..span))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user_id: String,
    pub session_id: String,
    pub scenario: String,
    pub messages: Vec<MessageRecord>,
}

#[derive(Clone)]
pub struct CitizenAssistant<S>
where
    S: TranscriptRepository,
{
    responder: IntentResponder,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    latency: LatencyProfile,
}

impl<S> CitizenAssistant<S>
where
    S: TranscriptRepository,
{
    pub fn new(store: Arc<S>, metrics: Arc<AppMetrics>, latency: LatencyProfile) -> Self {
        Self {
            responder: IntentResponder::default(),
            store,
            metrics,
            latency,
        }
    }

    pub fn with_responder(mut self, responder: IntentResponder) -> Self {
        self.responder = responder;
        self
    }

    /// Resolves a query after the simulated delay. Nothing is persisted.
    pub async fn answer(&self, query: &str, scenario: Option<ScenarioId>) -> Resolution {
        let delay = self.latency.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let resolution = self.responder.answer(query, scenario);
        self.metrics.record_route(resolution.route.label());
        self.metrics.observe_latency(delay);
        resolution
    }

    #[instrument(skip(self, input))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatReply> {
        let started = Instant::now();
        self.metrics.inc_request();

        let user_id = resolve_user_id(input.user_id);
        let session_id = resolve_session_id(input.session_id);
        let scenario_key = resolve_scenario_key(input.scenario.as_deref());
        let scenario = ScenarioId::parse(&scenario_key);

        self.persist(new_record(
            &user_id,
            &session_id,
            &scenario_key,
            Role::User,
            input.text.clone(),
            None,
        ))
        .await
        .context("failed to store user turn")?;

        let resolution = self.answer(&input.text, scenario).await;

        let reply_record = new_record(
            &user_id,
            &session_id,
            &scenario_key,
            Role::Assistant,
            resolution.payload.text.clone(),
            Some(resolution.payload.clone()),
        );
        let message_id = reply_record.message_id.clone();
        self.persist(reply_record)
            .await
            .context("failed to store assistant turn")?;

        let latency_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id = %session_id,
            scenario = %scenario_key,
            route = resolution.route.label(),
            latency_ms,
            "chat handled"
        );

        Ok(ChatReply {
            user_id,
            session_id,
            scenario: scenario_key,
            message_id,
            route: resolution.route,
            payload: resolution.payload,
            latency_ms,
        })
    }

    /// Loads the transcript for a session, seeding the scenario welcome
    /// message when it is empty.
    #[instrument(skip(self))]
    pub async fn open_session(
        &self,
        user_id: Option<String>,
        session_id: Option<String>,
        scenario: Option<&str>,
    ) -> Result<SessionView> {
        let user_id = resolve_user_id(user_id);
        let session_id = resolve_session_id(session_id);
        let scenario_key = resolve_scenario_key(scenario);

        let mut messages = self
            .transcript(&user_id, &session_id, &scenario_key)
            .await?;

        if messages.is_empty() {
            let welcome = welcome_payload(ScenarioId::parse(&scenario_key));
            let record = new_record(
                &user_id,
                &session_id,
                &scenario_key,
                Role::Assistant,
                welcome.text.clone(),
                Some(welcome),
            );
            self.persist(record.clone())
                .await
                .context("failed to store welcome message")?;
            messages.push(record);
        }

        Ok(SessionView {
            user_id,
            session_id,
            scenario: scenario_key,
            messages,
        })
    }

    pub async fn transcript(
        &self,
        user_id: &str,
        session_id: &str,
        scenario: &str,
    ) -> Result<Vec<MessageRecord>> {
        let scenario = resolve_scenario_key(Some(scenario));
        self.store
            .load_transcript(TranscriptKey {
                user_id,
                session_id,
                scenario: &scenario,
            })
            .await
            .context("failed to load transcript")
    }

    pub async fn purge_expired(&self, retention: chrono::Duration) -> Result<u64> {
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return Ok(0);
        };
        let removed = self.store.purge_before(cutoff).await?;
        if removed > 0 {
            info!(removed, "purged expired transcript messages");
        }
        Ok(removed)
    }

    async fn persist(&self, record: MessageRecord) -> Result<()> {
        if let Err(error) = self.store.append_message(&record).await {
            self.metrics.inc_storage_failure();
            warn!(
                session_id = %record.session_id,
                role = record.role.as_code(),
                error = %error,
                "transcript write failed"
            );
            return Err(error);
        }
        Ok(())
    }
}

fn resolve_user_id(user_id: Option<String>) -> String {
    user_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| format!("anon-{}", Uuid::new_v4().simple()))
}

fn resolve_session_id(session_id: Option<String>) -> String {
    session_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

fn resolve_scenario_key(scenario: Option<&str>) -> String {
    scenario
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| HOME_SCENARIO.to_string())
}

fn new_record(
    user_id: &str,
    session_id: &str,
    scenario: &str,
    role: Role,
    content: String,
    payload: Option<ResponsePayload>,
) -> MessageRecord {
    MessageRecord {
        message_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        session_id: session_id.to_string(),
        scenario: scenario.to_string(),
        role,
        content,
        payload,
        created_at: Utc::now(),
    }
}
