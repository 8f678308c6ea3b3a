//! The seven factor sub-scores. Each returns a 0-100 score plus a structured
//! detail payload; weighting and aggregation happen in the engine.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::domain::score::ComplexityTier;
use crate::domain::{FactorDetail, Request, SourcePerformance};

pub(crate) const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "as soon as possible",
    "immediately",
    "right away",
    "emergency",
    "this week",
    "time sensitive",
];

/// Markets where closed jobs historically carry outsized contract values.
pub(crate) const PREMIUM_MARKETS: &[&str] = &[
    "greenwich",
    "westport",
    "new canaan",
    "darien",
    "scarsdale",
    "rye",
];

/// Strip currency formatting (`$`, commas, whitespace) and parse the result
/// as one decimal amount. Range or prose text ("25k-40k", "call me") is
/// unparseable and yields 0.
pub(crate) fn parse_budget(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

fn message_has_urgency(message: &str) -> bool {
    let lowered = message.to_lowercase();
    URGENCY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Factor 1: data completeness. One point per resolved intake field, of 5.
pub(crate) fn data_completeness(request: &Request) -> (f64, FactorDetail) {
    let has_contact = request.contact.is_some();
    let has_budget = request
        .budget
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false);
    let has_product = request.has_specific_product();
    let has_address = request.address.is_some();
    let has_timeframe = request.visit_requested || message_has_urgency(&request.message);

    let points = [has_contact, has_budget, has_product, has_address, has_timeframe]
        .iter()
        .filter(|present| **present)
        .count() as f64;

    (
        points / 5.0 * 100.0,
        FactorDetail::Completeness {
            has_contact,
            has_budget,
            has_product,
            has_address,
            has_timeframe,
        },
    )
}

/// Factor 2: source quality from the performance table; unknown sources get
/// the documented defaults.
pub(crate) fn source_quality(
    request: &Request,
    performance: Option<&SourcePerformance>,
) -> (f64, FactorDetail) {
    let known = performance.is_some();
    let row = performance
        .cloned()
        .unwrap_or_else(|| SourcePerformance::unknown(request.source.clone()));

    let score = row.reliability * 50.0 + row.conversion_rate * 50.0;
    let detail = FactorDetail::Source {
        known,
        reliability: row.reliability,
        conversion_rate: row.conversion_rate,
        tier: row.tier(),
    };
    (score, detail)
}

/// Factor 3: engagement level. One point per signal, of 4.
pub(crate) fn engagement(request: &Request, now: DateTime<Utc>) -> (f64, FactorDetail) {
    let has_attachments = request.attachment_count > 0;
    let long_message = request.message.chars().count() > 100;
    let visit_requested = request.visit_requested;
    let fresh_submission = now - request.created_at <= Duration::hours(4);

    let points = [has_attachments, long_message, visit_requested, fresh_submission]
        .iter()
        .filter(|present| **present)
        .count() as f64;

    (
        points / 4.0 * 100.0,
        FactorDetail::Engagement {
            has_attachments,
            long_message,
            visit_requested,
            fresh_submission,
        },
    )
}

/// Factor 4: budget alignment with stepped bonuses per amount tier.
pub(crate) fn budget_alignment(request: &Request) -> (f64, FactorDetail) {
    let text = request.budget.as_deref().unwrap_or("");
    let specified = !text.trim().is_empty();
    let amount = parse_budget(text);

    let mut score: f64 = if specified && amount > 0.0 { 20.0 } else { 10.0 };
    if amount >= 15_000.0 {
        score += 30.0;
    }
    if amount >= 25_000.0 {
        score += 20.0;
    }
    if amount >= 50_000.0 {
        score += 20.0;
    }
    if amount >= 100_000.0 {
        score += 10.0;
    }

    (score.min(100.0), FactorDetail::Budget { specified, amount })
}

pub(crate) struct ComplexityProfile {
    pub base: f64,
    pub tier: ComplexityTier,
    pub skills: &'static [&'static str],
    pub weeks: u8,
}

/// Per-product complexity table.
pub(crate) fn complexity_profile(product: &str) -> ComplexityProfile {
    let lowered = product.to_lowercase();
    if lowered.contains("kitchen") {
        ComplexityProfile {
            base: 80.0,
            tier: ComplexityTier::High,
            skills: &["cabinetry", "plumbing", "electrical"],
            weeks: 8,
        }
    } else if lowered.contains("addition") || lowered.contains("extension") {
        ComplexityProfile {
            base: 90.0,
            tier: ComplexityTier::Custom,
            skills: &["structural", "permitting", "framing"],
            weeks: 16,
        }
    } else if lowered.contains("basement") {
        ComplexityProfile {
            base: 75.0,
            tier: ComplexityTier::High,
            skills: &["waterproofing", "framing", "electrical"],
            weeks: 10,
        }
    } else if lowered.contains("bathroom") {
        ComplexityProfile {
            base: 70.0,
            tier: ComplexityTier::Moderate,
            skills: &["tiling", "plumbing"],
            weeks: 4,
        }
    } else if lowered.contains("roof") {
        ComplexityProfile {
            base: 65.0,
            tier: ComplexityTier::Moderate,
            skills: &["roofing"],
            weeks: 2,
        }
    } else if lowered.contains("deck") || lowered.contains("patio") {
        ComplexityProfile {
            base: 55.0,
            tier: ComplexityTier::Moderate,
            skills: &["carpentry"],
            weeks: 3,
        }
    } else if lowered.contains("floor") {
        ComplexityProfile {
            base: 50.0,
            tier: ComplexityTier::Low,
            skills: &["flooring"],
            weeks: 2,
        }
    } else if lowered.contains("paint") {
        ComplexityProfile {
            base: 40.0,
            tier: ComplexityTier::Low,
            skills: &["painting"],
            weeks: 1,
        }
    } else if lowered.contains("window") || lowered.contains("door") {
        ComplexityProfile {
            base: 45.0,
            tier: ComplexityTier::Low,
            skills: &["installation"],
            weeks: 1,
        }
    } else {
        ComplexityProfile {
            base: 50.0,
            tier: ComplexityTier::Moderate,
            skills: &["general"],
            weeks: 4,
        }
    }
}

/// Factor 5: project complexity, adjusted by the budget envelope.
pub(crate) fn project_complexity(request: &Request) -> (f64, FactorDetail) {
    let profile = complexity_profile(&request.product);
    let amount = parse_budget(request.budget.as_deref().unwrap_or(""));

    let mut score = profile.base;
    if amount > 100_000.0 {
        score = (score + 15.0).min(100.0);
    } else if amount > 0.0 && amount < 25_000.0 {
        score = (score - 10.0).max(30.0);
    }

    (
        score,
        FactorDetail::Complexity {
            tier: profile.tier,
            skills: profile.skills.iter().map(|s| s.to_string()).collect(),
            estimated_weeks: profile.weeks,
        },
    )
}

/// Factor 6: geographic fit.
pub(crate) fn geographic_fit(request: &Request) -> (f64, FactorDetail) {
    let address_resolved = request.address.is_some();
    let premium_market = request
        .city
        .as_deref()
        .map(|city| {
            let lowered = city.to_lowercase();
            PREMIUM_MARKETS.iter().any(|market| lowered.contains(market))
        })
        .unwrap_or(false);

    let mut score: f64 = 70.0;
    if address_resolved {
        score += 20.0;
    }
    if premium_market {
        score += 10.0;
    }

    let detail = FactorDetail::Geography {
        address_resolved,
        premium_market,
        market_strength: if premium_market { "premium" } else { "standard" }.to_string(),
        territory: if premium_market {
            request.city.clone()
        } else {
            None
        },
    };
    (score.min(100.0), detail)
}

/// Factor 7: urgency indicators, including the Apr-Oct construction season.
pub(crate) fn urgency(request: &Request, now: DateTime<Utc>) -> (f64, FactorDetail) {
    let keyword_hit = message_has_urgency(&request.message);
    let visit_requested = request.visit_requested;
    let in_season = (4..=10).contains(&now.month());

    let mut score: f64 = 50.0;
    if keyword_hit {
        score += 25.0;
    }
    if visit_requested {
        score += 15.0;
    }
    if in_season {
        score += 10.0;
    }

    (
        score.min(100.0),
        FactorDetail::Urgency {
            keyword_hit,
            visit_requested,
            in_season,
            urgent_timeframe: keyword_hit,
        },
    )
}
