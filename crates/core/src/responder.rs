use serde::Serialize;

use crate::content::content_for;
use crate::intent::{normalize_query, Rule, RuleTable};
use crate::models::{ResponsePayload, Route, ScenarioId};

#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub route: Route,
    pub payload: ResponsePayload,
}

/// Pure mapping from `(query, scenario)` to a canned payload. Latency
/// simulation lives with the caller.
#[derive(Debug, Clone, Default)]
pub struct IntentResponder {
    rules: RuleTable,
}

impl IntentResponder {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push_before_fallback(rule);
        self
    }

    pub fn resolve(&self, query: &str, scenario: Option<ScenarioId>) -> Route {
        self.rules.resolve(&normalize_query(query), scenario)
    }

    pub fn respond(&self, query: &str, scenario: Option<ScenarioId>) -> ResponsePayload {
        self.answer(query, scenario).payload
    }

    pub fn answer(&self, query: &str, scenario: Option<ScenarioId>) -> Resolution {
        let route = self.resolve(query, scenario);
        Resolution {
            route,
            payload: content_for(route),
        }
    }

    /// Same as [`respond`](Self::respond) but takes the scenario as the raw
    /// key a client sent; unknown keys behave like no scenario.
    pub fn respond_raw(&self, query: &str, scenario_key: &str) -> ResponsePayload {
        self.respond(query, ScenarioId::parse(scenario_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TopicKey};

    fn responder() -> IntentResponder {
        IntentResponder::default()
    }

    #[test]
    fn exact_topics_return_fixed_payloads() {
        let expected = [
            (
                TopicKey::ApplyForSubsidy,
                5,
                "Detail retrieval",
                APPLY_FOR_SUBSIDY_TEXT,
            ),
            (
                TopicKey::BenefitFinder,
                4,
                "Provider search logic",
                BENEFIT_FINDER_TEXT,
            ),
            (
                TopicKey::EligibilityCalculator,
                3,
                "Eligibility synthesis",
                ELIGIBILITY_CALCULATOR_TEXT,
            ),
            (
                TopicKey::ProviderQualityRatings,
                4,
                "QRIS Data retrieval",
                PROVIDER_QUALITY_RATINGS_TEXT,
            ),
            (
                TopicKey::PaymentSchedule,
                2,
                "Financial schedule logic",
                PAYMENT_SCHEDULE_TEXT,
            ),
        ];

        for (topic, sources, process, text) in expected {
            let resolution = responder().answer(topic.literal(), Some(ScenarioId::Home));
            assert_eq!(resolution.route, Route::ExactTopic(topic));
            assert_eq!(resolution.payload.text, text, "{topic:?}");
            let diagnostics = resolution.payload.diagnostics.expect("diagnostics");
            assert_eq!(diagnostics.source_count, sources);
            assert_eq!(diagnostics.process_label, process);
            assert!(resolution.payload.cards.is_empty());
        }
    }

    #[test]
    fn card_titles_resent_as_queries_hit_exact_topics() {
        let benefits = responder().respond("child care", None);
        for card in &benefits.cards {
            assert!(matches!(
                responder().resolve(&card.title, None),
                Route::ExactTopic(_)
            ));
        }
        for topic in &benefits.topics {
            assert!(matches!(
                responder().resolve(topic, Some(ScenarioId::Home)),
                Route::ExactTopic(_)
            ));
        }
    }

    #[test]
    fn mismatched_labels_fall_back_silently() {
        // Housing topic labels have no exact payload of their own.
        assert_eq!(
            responder().resolve("Income Limit Chart", Some(ScenarioId::Housing)),
            Route::ScenarioFallback(Category::Housing)
        );
        assert_eq!(
            responder().resolve("Emergency Housing", Some(ScenarioId::Home)),
            Route::Category(Category::Housing)
        );
        assert_eq!(
            responder().resolve("Apply for  Subsidy", Some(ScenarioId::Home)),
            Route::GenericFallback
        );
    }

    #[test]
    fn greetings_have_no_cards_or_topics() {
        for query in ["hello", "Hi there"] {
            let payload = responder().respond(query, Some(ScenarioId::Tax));
            assert!(payload.cards.is_empty());
            assert!(payload.topics.is_empty());
            assert!(payload.diagnostics.is_none());
        }
    }

    #[test]
    fn keyword_takes_priority_over_scenario_context() {
        assert_eq!(
            responder().resolve("I need to renew my vehicle", Some(ScenarioId::Home)),
            Route::Category(Category::Vehicle)
        );
        assert_eq!(
            responder().resolve("I need to renew my vehicle", Some(ScenarioId::Housing)),
            Route::Category(Category::Vehicle)
        );
    }

    #[test]
    fn scenario_fallback_matches_direct_keyword_payload() {
        assert_eq!(
            responder().respond("xyzzy", Some(ScenarioId::Tax)),
            responder().respond("tax", Some(ScenarioId::Home))
        );
    }

    #[test]
    fn generic_fallback_offers_the_directory() {
        let payload = responder().respond("xyzzy", Some(ScenarioId::Home));
        assert_eq!(payload.cards.len(), 1);
        assert_eq!(payload.cards[0].title, "Service Directory");
        assert_eq!(
            payload.topics,
            vec!["Tax Office", "Transit Services", "Social Aid", "Housing Help"]
        );
        assert_eq!(payload.diagnostics.map(|d| d.source_count), Some(0));
    }

    #[test]
    fn unknown_scenario_key_routes_like_home() {
        assert_eq!(
            responder().respond_raw("xyzzy", "parks"),
            responder().respond("xyzzy", Some(ScenarioId::Home))
        );
        assert_eq!(
            responder().respond_raw("xyzzy", "TAX"),
            responder().respond("tax", None)
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let first = responder().respond("How do I apply for housing?", None);
        let second = responder().respond("How do I apply for housing?", None);
        assert_eq!(first, second);
    }

    const APPLY_FOR_SUBSIDY_TEXT: &str = "Childcare subsidies help cover care costs, with application processes varying by region (e.g., National Childcare Scheme (NCS) in Ireland, (Services Australia) in Australia. Key requirements usually include proof of income, employment/study status, and child’s details (PPSN/DOB), typically processed online via government portals.\n\n**Common Steps to Apply**\n• **Check Eligibility:** Assess income limits and required hours of care.\n• **Gather Documents:** Prepare pay stubs, employment letters, and proof of residency.\n• **Submit Application:** Use official government portals.\n• **Confirm Provider:** Ensure your childcare provider is registered/contracted with the scheme.\n\n**Regional Examples**\n• **Ireland (NCS):** Offers universal and income-assessed subsidies.\n• **Australia (CCS):** Requires a claim via Centrelink.\n\n**Important:** Apply as soon as possible, as some schemes cannot backdate payments more than 28 days.";

    const BENEFIT_FINDER_TEXT: &str = "Find licensed childcare providers using government-approved search tools like Starting Blocks(AU) or local Family Information Services (UK) to check quality ratings and inspection reports.\n\n**Key Resources for Finding Providers**\n• **Government Portals:** Check state department websites for licensed centers or national sites like (Gov.uk).\n• **Search Engines:** Use platforms such as Childcare.co.uk to find local nannies and nurseries.\n\n**Steps to Take When Selecting a Provider**\n1. **Verify Credentials:** Ensure the provider is registered and authorized.\n2. **Conduct Tours:** Visit the facility to assess safety and interaction.\n3. **Check Reviews:** Look at feedback from other parents.\n\n**What to Look for During a Visit**\n• **Interaction:** Providers should be actively engaged with the children.\n• **Safety:** Ensure the premises are secure and well-maintained.";

    const ELIGIBILITY_CALCULATOR_TEXT: &str = "UK childcare support includes 15-30 hours of free care, Tax-Free Childcare, or Universal Credit, based on income and working status. Eligible working parents in England usually need to earn over the National Minimum Wage for 16 hours/week and under £100k adjusted net income. Use the (GOV.UK calculator) to compare options.\n\n**Key Eligibility & Information**\n• **Age Groups:** 9 months up to 4 years old.\n• **Income Thresholds:** Earn at least minimum wage and under £100,000.\n• **Working Status:** Both parents must be working (or one in a single-parent family).\n\n**Types of Support**\n• **15/30 Hours Free:** For 3-4 year olds.\n• **Tax-Free Childcare:** Up to £2,000 a year per child.\n• **Universal Credit:** Covers up to 85% of costs.";

    const PROVIDER_QUALITY_RATINGS_TEXT: &str = "Childcare Quality Rating and Improvement Systems (QRIS) are state-specific tools that measure, improve, and communicate the quality of early childhood programs, often using a star-rating system.\n\n**Key Aspects of Quality Ratings**\n• **Purpose:** QRIS helps parents identify high-quality care beyond basic licensing.\n• **Rating Criteria:** Based on staff qualifications, curriculum, and safety features.\n• **Star Ratings:** Typically 1-to-5 stars denote levels of standard met.\n\n**How to Find and Use Ratings**\n• **Search Online:** Use the Child Care Aware® of America website.\n• **Check Local Records:** View inspection visits and violations for the past three years.";

    const PAYMENT_SCHEDULE_TEXT: &str = "Childcare subsidy payments follow specific cycles. Most government schemes pay in arrears, meaning funds are released after care has been provided and attendance has been verified.\n\n**Standard Timelines**\n• **Frequency:** Payments are typically processed every 2 or 4 weeks.\n• **Method:** Subsidies are usually paid directly to the registered provider.\n• **Annual Reviews:** Eligibility and payment tiers are reviewed annually; ensure your income data is updated.";
}
