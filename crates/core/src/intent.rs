use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Category, Route, ScenarioId, TopicKey};

// ASCII word boundaries: a non-ASCII letter next to the word does not block it.
static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)(hi|hello|hey)(?-u:\b)").expect("valid greeting regex")
});

const SANITATION_KEYWORDS: &[&str] = &["waste", "trash", "recycling"];

/// Department keywords in tie-break order; the first category with any hit wins.
const DOMAIN_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Benefits, &["child", "benefit"]),
    (Category::Housing, &["hous"]),
    (Category::Tax, &["tax"]),
    (Category::Vehicle, &["vehicle"]),
];

/// Trim and lowercase. Inner whitespace is left alone so exact topic
/// literals only match labels authored the same way.
pub fn normalize_query(input: &str) -> String {
    input.trim().to_lowercase()
}

pub type Matcher = fn(&str, Option<ScenarioId>) -> Option<Route>;

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    matcher: Matcher,
}

impl Rule {
    pub fn new(name: &'static str, matcher: Matcher) -> Self {
        Self { name, matcher }
    }

    pub fn evaluate(&self, normalized: &str, scenario: Option<ScenarioId>) -> Option<Route> {
        (self.matcher)(normalized, scenario)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Ordered rules, first match wins. The last rule always matches.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleTable {
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Rule::new("exact_topic", match_exact_topic),
                Rule::new("sanitation_keywords", match_sanitation),
                Rule::new("domain_keywords", match_domain),
                Rule::new("greeting", match_greeting),
                Rule::new("scenario_fallback", match_scenario),
                Rule::new("generic_fallback", match_anything),
            ],
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Inserts a rule just ahead of the terminal generic fallback.
    pub fn push_before_fallback(&mut self, rule: Rule) {
        let at = self.rules.len().saturating_sub(1);
        self.rules.insert(at, rule);
    }

    pub fn resolve(&self, normalized: &str, scenario: Option<ScenarioId>) -> Route {
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(normalized, scenario))
            .unwrap_or(Route::GenericFallback)
    }
}

fn match_exact_topic(text: &str, _: Option<ScenarioId>) -> Option<Route> {
    TopicKey::from_normalized(text).map(Route::ExactTopic)
}

fn match_sanitation(text: &str, _: Option<ScenarioId>) -> Option<Route> {
    contains_any(text, SANITATION_KEYWORDS).then_some(Route::Category(Category::Sanitation))
}

fn match_domain(text: &str, _: Option<ScenarioId>) -> Option<Route> {
    DOMAIN_KEYWORDS
        .iter()
        .find(|(_, needles)| contains_any(text, needles))
        .map(|(category, _)| Route::Category(*category))
}

fn match_greeting(text: &str, _: Option<ScenarioId>) -> Option<Route> {
    GREETING.is_match(text).then_some(Route::Greeting)
}

fn match_scenario(_: &str, scenario: Option<ScenarioId>) -> Option<Route> {
    scenario
        .and_then(ScenarioId::category)
        .map(Route::ScenarioFallback)
}

fn match_anything(_: &str, _: Option<ScenarioId>) -> Option<Route> {
    Some(Route::GenericFallback)
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
