//! Canned response content. Nothing in here decides routing; the rule table
//! in `intent` picks a [`Route`] and this module maps it to a payload.

use crate::models::{
    ActionCard, Category, Diagnostics, ResponsePayload, Route, ScenarioId, ScenarioInfo, TopicKey,
};

pub const SITE_NAME: &str = "PublicSphere";

const VIEW_DETAILS: &str = "View Details";

struct CardSpec {
    title: &'static str,
    description: &'static str,
    icon_key: &'static str,
    color_tag: &'static str,
}

struct DiagnosticsSpec {
    process: &'static str,
    reasoning: &'static str,
    sources: u32,
}

struct PayloadSpec {
    text: &'static str,
    cards: &'static [CardSpec],
    topics: &'static [&'static str],
    diagnostics: Option<DiagnosticsSpec>,
}

impl PayloadSpec {
    fn build(&self) -> ResponsePayload {
        ResponsePayload {
            text: self.text.to_string(),
            cards: self
                .cards
                .iter()
                .map(|card| ActionCard {
                    title: card.title.to_string(),
                    description: card.description.to_string(),
                    icon_key: card.icon_key.to_string(),
                    action_label: VIEW_DETAILS.to_string(),
                    color_tag: card.color_tag.to_string(),
                })
                .collect(),
            topics: self.topics.iter().map(|topic| topic.to_string()).collect(),
            diagnostics: self.diagnostics.as_ref().map(|spec| Diagnostics {
                process_label: spec.process.to_string(),
                reasoning_text: spec.reasoning.to_string(),
                source_count: spec.sources,
            }),
        }
    }
}

pub fn content_for(route: Route) -> ResponsePayload {
    match route {
        Route::ExactTopic(topic) => topic_spec(topic).build(),
        Route::Category(category) | Route::ScenarioFallback(category) => {
            category_spec(category).build()
        }
        Route::Greeting => GREETING.build(),
        Route::GenericFallback => GENERIC_FALLBACK.build(),
    }
}

pub fn welcome_payload(scenario: Option<ScenarioId>) -> ResponsePayload {
    match scenario {
        Some(id) if id != ScenarioId::Home => {
            ResponsePayload::text_only(format!("Welcome to the {} assistant.", id.info().name))
        }
        _ => ResponsePayload::text_only(format!(
            "Welcome to {SITE_NAME}. How can I assist you with city services today?"
        )),
    }
}

impl ScenarioId {
    pub fn info(self) -> ScenarioInfo {
        match self {
            Self::Home => ScenarioInfo {
                id: self,
                name: SITE_NAME,
                brand: SITE_NAME,
                hero_title: "The Unified Citizen Services Portal",
                hero_subtitle: "Tax, vehicle, benefits and housing services in one place.",
                query_suggestion: None,
            },
            Self::Tax => ScenarioInfo {
                id: self,
                name: "Tax Office",
                brand: "TaxCentral",
                hero_title: "Annual Tax Assessment",
                hero_subtitle: "Review your obligations and submit required fiscal documentation.",
                query_suggestion: Some("How to file taxes?"),
            },
            Self::Vehicle => ScenarioInfo {
                id: self,
                name: "Vehicle Services",
                brand: "AutoReg",
                hero_title: "Vehicle Services Portal",
                hero_subtitle: "Renew registrations, pay fines, and manage titles online.",
                query_suggestion: Some("Renew vehicle registration"),
            },
            Self::Benefits => ScenarioInfo {
                id: self,
                name: "Unemployment",
                brand: "LaborAssist",
                hero_title: "Unemployment Assistance",
                hero_subtitle: "Supporting the workforce during transitions with financial aid and job placement.",
                query_suggestion: Some("Apply for child care benefits"),
            },
            Self::Housing => ScenarioInfo {
                id: self,
                name: "Housing Authority",
                brand: "CityHomes",
                hero_title: "Affordable Housing Initiative",
                hero_subtitle: "Connecting families with safe, affordable, and sustainable housing options.",
                query_suggestion: Some("How to apply for housing?"),
            },
        }
    }
}

/// Department scenarios in navigation order.
pub fn scenario_catalog() -> Vec<ScenarioInfo> {
    [
        ScenarioId::Tax,
        ScenarioId::Vehicle,
        ScenarioId::Benefits,
        ScenarioId::Housing,
    ]
    .into_iter()
    .map(ScenarioId::info)
    .collect()
}

fn topic_spec(topic: TopicKey) -> &'static PayloadSpec {
    match topic {
        TopicKey::ApplyForSubsidy => &APPLY_FOR_SUBSIDY,
        TopicKey::BenefitFinder => &BENEFIT_FINDER,
        TopicKey::EligibilityCalculator => &ELIGIBILITY_CALCULATOR,
        TopicKey::ProviderQualityRatings => &PROVIDER_QUALITY_RATINGS,
        TopicKey::PaymentSchedule => &PAYMENT_SCHEDULE,
    }
}

fn category_spec(category: Category) -> &'static PayloadSpec {
    match category {
        Category::Sanitation => &SANITATION,
        Category::Benefits => &BENEFITS,
        Category::Housing => &HOUSING,
        Category::Tax => &TAX,
        Category::Vehicle => &VEHICLE,
    }
}

static APPLY_FOR_SUBSIDY: PayloadSpec = PayloadSpec {
    text: "Childcare subsidies help cover care costs, with application processes varying by region (e.g., National Childcare Scheme (NCS) in Ireland, (Services Australia) in Australia. Key requirements usually include proof of income, employment/study status, and child’s details (PPSN/DOB), typically processed online via government portals.\n\n**Common Steps to Apply**\n• **Check Eligibility:** Assess income limits and required hours of care.\n• **Gather Documents:** Prepare pay stubs, employment letters, and proof of residency.\n• **Submit Application:** Use official government portals.\n• **Confirm Provider:** Ensure your childcare provider is registered/contracted with the scheme.\n\n**Regional Examples**\n• **Ireland (NCS):** Offers universal and income-assessed subsidies.\n• **Australia (CCS):** Requires a claim via Centrelink.\n\n**Important:** Apply as soon as possible, as some schemes cannot backdate payments more than 28 days.",
    cards: &[],
    topics: &[],
    diagnostics: Some(DiagnosticsSpec {
        process: "Detail retrieval",
        reasoning: "Synthesized multi-regional subsidy application guidelines.",
        sources: 5,
    }),
};

static BENEFIT_FINDER: PayloadSpec = PayloadSpec {
    text: "Find licensed childcare providers using government-approved search tools like Starting Blocks(AU) or local Family Information Services (UK) to check quality ratings and inspection reports.\n\n**Key Resources for Finding Providers**\n• **Government Portals:** Check state department websites for licensed centers or national sites like (Gov.uk).\n• **Search Engines:** Use platforms such as Childcare.co.uk to find local nannies and nurseries.\n\n**Steps to Take When Selecting a Provider**\n1. **Verify Credentials:** Ensure the provider is registered and authorized.\n2. **Conduct Tours:** Visit the facility to assess safety and interaction.\n3. **Check Reviews:** Look at feedback from other parents.\n\n**What to Look for During a Visit**\n• **Interaction:** Providers should be actively engaged with the children.\n• **Safety:** Ensure the premises are secure and well-maintained.",
    cards: &[],
    topics: &[],
    diagnostics: Some(DiagnosticsSpec {
        process: "Provider search logic",
        reasoning: "Extracted safety and quality benchmarks from accreditation standards.",
        sources: 4,
    }),
};

static ELIGIBILITY_CALCULATOR: PayloadSpec = PayloadSpec {
    text: "UK childcare support includes 15-30 hours of free care, Tax-Free Childcare, or Universal Credit, based on income and working status. Eligible working parents in England usually need to earn over the National Minimum Wage for 16 hours/week and under £100k adjusted net income. Use the (GOV.UK calculator) to compare options.\n\n**Key Eligibility & Information**\n• **Age Groups:** 9 months up to 4 years old.\n• **Income Thresholds:** Earn at least minimum wage and under £100,000.\n• **Working Status:** Both parents must be working (or one in a single-parent family).\n\n**Types of Support**\n• **15/30 Hours Free:** For 3-4 year olds.\n• **Tax-Free Childcare:** Up to £2,000 a year per child.\n• **Universal Credit:** Covers up to 85% of costs.",
    cards: &[],
    topics: &[],
    diagnostics: Some(DiagnosticsSpec {
        process: "Eligibility synthesis",
        reasoning: "Parsed UK 2025/26 tax year childcare thresholds.",
        sources: 3,
    }),
};

static PROVIDER_QUALITY_RATINGS: PayloadSpec = PayloadSpec {
    text: "Childcare Quality Rating and Improvement Systems (QRIS) are state-specific tools that measure, improve, and communicate the quality of early childhood programs, often using a star-rating system.\n\n**Key Aspects of Quality Ratings**\n• **Purpose:** QRIS helps parents identify high-quality care beyond basic licensing.\n• **Rating Criteria:** Based on staff qualifications, curriculum, and safety features.\n• **Star Ratings:** Typically 1-to-5 stars denote levels of standard met.\n\n**How to Find and Use Ratings**\n• **Search Online:** Use the Child Care Aware® of America website.\n• **Check Local Records:** View inspection visits and violations for the past three years.",
    cards: &[],
    topics: &[],
    diagnostics: Some(DiagnosticsSpec {
        process: "QRIS Data retrieval",
        reasoning: "Cross-referenced US state-level accreditation benchmarks.",
        sources: 4,
    }),
};

static PAYMENT_SCHEDULE: PayloadSpec = PayloadSpec {
    text: "Childcare subsidy payments follow specific cycles. Most government schemes pay in arrears, meaning funds are released after care has been provided and attendance has been verified.\n\n**Standard Timelines**\n• **Frequency:** Payments are typically processed every 2 or 4 weeks.\n• **Method:** Subsidies are usually paid directly to the registered provider.\n• **Annual Reviews:** Eligibility and payment tiers are reviewed annually; ensure your income data is updated.",
    cards: &[],
    topics: &[],
    diagnostics: Some(DiagnosticsSpec {
        process: "Financial schedule logic",
        reasoning: "Analyzed standard government disbursement protocols.",
        sources: 2,
    }),
};

static SANITATION: PayloadSpec = PayloadSpec {
    text: "Waste collection schedules are determined by municipal zones. Enter your address in the locator below to find your specific pickup days.",
    cards: &[CardSpec {
        title: "Find My Zone",
        description: "Address-based zone lookup tool.",
        icon_key: "MapPin",
        color_tag: "blue",
    }],
    topics: &["Bulk Pickup Request", "Holiday Changes", "Hazardous Waste"],
    diagnostics: Some(DiagnosticsSpec {
        process: "Zone lookup",
        reasoning: "Accessed Sanitation Dept 2026 Zone Mapping.",
        sources: 1,
    }),
};

static BENEFITS: PayloadSpec = PayloadSpec {
    text: "Childcare subsidies and benefit schemes provide financial support to help working families manage the cost of early education. Eligibility is primarily determined by household income, working hours, and the age of your child.",
    cards: &[
        CardSpec {
            title: "Apply for Subsidy",
            description: "Ages 0-5. Apply for financial assistance online.",
            icon_key: "Users",
            color_tag: "blue",
        },
        CardSpec {
            title: "Benefit Finder",
            description: "Locate and compare licensed providers near you.",
            icon_key: "MapPin",
            color_tag: "green",
        },
    ],
    topics: &[
        "Eligibility Calculator",
        "Provider Quality Ratings",
        "Payment Schedule",
    ],
    diagnostics: Some(DiagnosticsSpec {
        process: "Benefits Routing",
        reasoning: "Identified childcare intent. Retrieved summary and primary intake/search cards.",
        sources: 3,
    }),
};

static HOUSING: PayloadSpec = PayloadSpec {
    text: "To apply for housing assistance, start by verifying your eligibility based on [regional income limits](https://www.huduser.gov/portal/datasets/il.html). You can manage Section 8 applications and browse affordable listings via the portals below.",
    cards: &[
        CardSpec {
            title: "Section 8 Info",
            description: "Program requirements and waitlists.",
            icon_key: "Home",
            color_tag: "blue",
        },
        CardSpec {
            title: "Affordable Map",
            description: "Search current affordable city listings.",
            icon_key: "MapPin",
            color_tag: "green",
        },
    ],
    topics: &[
        "Income Limit Chart",
        "Required Documentation",
        "Emergency Housing",
    ],
    diagnostics: Some(DiagnosticsSpec {
        process: "Housing DB Lookup",
        reasoning: "Matched query against Area Median Income tables.",
        sources: 2,
    }),
};

static TAX: PayloadSpec = PayloadSpec {
    text: "Digital filing is the recommended path for local tax returns. Most residents can complete their submission within 20 minutes using our secure e-file portal.",
    cards: &[
        CardSpec {
            title: "E-File Portal",
            description: "Secure digital submission and tracking.",
            icon_key: "FileCheck",
            color_tag: "blue",
        },
        CardSpec {
            title: "Tax Help",
            description: "Interactive filing assistance and FAQs.",
            icon_key: "HelpCircle",
            color_tag: "green",
        },
    ],
    topics: &["Download Forms", "Payment Plan Options", "Tax Calendar"],
    diagnostics: Some(DiagnosticsSpec {
        process: "Tax Procedure Retrieval",
        reasoning: "Analyzed current deadlines and filing protocols.",
        sources: 3,
    }),
};

static VEHICLE: PayloadSpec = PayloadSpec {
    text: "You can renew your vehicle registration and manage parking citations entirely online. Please ensure your insurance and emissions status are current.",
    cards: &[
        CardSpec {
            title: "Renew Now",
            description: "Digital registration renewal portal.",
            icon_key: "Car",
            color_tag: "blue",
        },
        CardSpec {
            title: "Pay Citation",
            description: "Secure ticket and fine payment processing.",
            icon_key: "FileCheck",
            color_tag: "green",
        },
    ],
    topics: &[
        "Permit Zone Lookup",
        "Lost Title Process",
        "Plate Replacement",
    ],
    diagnostics: Some(DiagnosticsSpec {
        process: "Vehicle Portal Routing",
        reasoning: "Verified state transit authority requirements.",
        sources: 1,
    }),
};

static GREETING: PayloadSpec = PayloadSpec {
    text: "Welcome to PublicSphere. I can assist you with city services today. What can I help you find?",
    cards: &[],
    topics: &[],
    diagnostics: None,
};

static GENERIC_FALLBACK: PayloadSpec = PayloadSpec {
    text: "I can assist you with local government services. Please choose a department or describe your request in more detail.",
    cards: &[CardSpec {
        title: "Service Directory",
        description: "Browse all city departments and tools.",
        icon_key: "Grid",
        color_tag: "blue",
    }],
    topics: &["Tax Office", "Transit Services", "Social Aid", "Housing Help"],
    diagnostics: Some(DiagnosticsSpec {
        process: "Fallback",
        reasoning: "Generic intent matched based on limited query scope.",
        sources: 0,
    }),
};
