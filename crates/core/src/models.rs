use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    Home,
    Tax,
    Vehicle,
    Benefits,
    Housing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scenario `{0}` (expected one of: home, tax, vehicle, benefits, housing)")]
pub struct UnknownScenario(pub String);

impl ScenarioId {
    pub const ALL: [ScenarioId; 5] = [
        Self::Home,
        Self::Tax,
        Self::Vehicle,
        Self::Benefits,
        Self::Housing,
    ];

    /// Lenient lookup used on the request path; anything unrecognized routes
    /// as if no scenario were active.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "home" => Some(Self::Home),
            "tax" => Some(Self::Tax),
            "vehicle" => Some(Self::Vehicle),
            "benefits" => Some(Self::Benefits),
            "housing" => Some(Self::Housing),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Tax => "tax",
            Self::Vehicle => "vehicle",
            Self::Benefits => "benefits",
            Self::Housing => "housing",
        }
    }

    /// Department category a non-home scenario falls back to.
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Home => None,
            Self::Tax => Some(Category::Tax),
            Self::Vehicle => Some(Category::Vehicle),
            Self::Benefits => Some(Category::Benefits),
            Self::Housing => Some(Category::Housing),
        }
    }
}

impl FromStr for ScenarioId {
    type Err = UnknownScenario;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownScenario(value.to_string()))
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sanitation,
    Benefits,
    Housing,
    Tax,
    Vehicle,
}

impl Category {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Sanitation => "sanitation",
            Self::Benefits => "benefits",
            Self::Housing => "housing",
            Self::Tax => "tax",
            Self::Vehicle => "vehicle",
        }
    }
}

/// Literal labels that cards and related topics resend as the next query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKey {
    ApplyForSubsidy,
    BenefitFinder,
    EligibilityCalculator,
    ProviderQualityRatings,
    PaymentSchedule,
}

impl TopicKey {
    pub const ALL: [TopicKey; 5] = [
        Self::ApplyForSubsidy,
        Self::BenefitFinder,
        Self::EligibilityCalculator,
        Self::ProviderQualityRatings,
        Self::PaymentSchedule,
    ];

    /// Normalized form the query must equal exactly.
    pub fn literal(self) -> &'static str {
        match self {
            Self::ApplyForSubsidy => "apply for subsidy",
            Self::BenefitFinder => "benefit finder",
            Self::EligibilityCalculator => "eligibility calculator",
            Self::ProviderQualityRatings => "provider quality ratings",
            Self::PaymentSchedule => "payment schedule",
        }
    }

    pub fn from_normalized(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.literal() == text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Route {
    ExactTopic(TopicKey),
    Category(Category),
    Greeting,
    ScenarioFallback(Category),
    GenericFallback,
}

impl Route {
    pub fn label(self) -> &'static str {
        match self {
            Self::ExactTopic(_) => "exact_topic",
            Self::Category(_) => "category",
            Self::Greeting => "greeting",
            Self::ScenarioFallback(_) => "scenario_fallback",
            Self::GenericFallback => "generic_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCard {
    pub title: String,
    pub description: String,
    pub icon_key: String,
    pub action_label: String,
    pub color_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub process_label: String,
    pub reasoning_text: String,
    pub source_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub text: String,
    #[serde(default)]
    pub cards: Vec<ActionCard>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl ResponsePayload {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cards: Vec::new(),
            topics: Vec::new(),
            diagnostics: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioInfo {
    pub id: ScenarioId,
    pub name: &'static str,
    pub brand: &'static str,
    pub hero_title: &'static str,
    pub hero_subtitle: &'static str,
    pub query_suggestion: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One persisted chat turn. The scenario is kept as the raw key the caller
/// sent so transcripts for unrecognized scenarios still replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: String,
    pub user_id: String,
    pub session_id: String,
    pub scenario: String,
    pub role: Role,
    pub content: String,
    pub payload: Option<ResponsePayload>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub scenario: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub user_id: String,
    pub session_id: String,
    pub scenario: String,
    pub message_id: String,
    pub route: Route,
    pub payload: ResponsePayload,
    pub latency_ms: u64,
}
