pub mod content;
pub mod intent;
pub mod markup;
pub mod models;
pub mod responder;

pub use content::{content_for, scenario_catalog, welcome_payload, SITE_NAME};
pub use intent::{normalize_query, Rule, RuleTable};
pub use markup::{parse_markup, render_html, render_plain, Segment};
pub use models::*;
pub use responder::{IntentResponder, Resolution};
