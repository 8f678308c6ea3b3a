use crate::error::AppError;
use crate::infra::{InMemoryDispatcher, InMemoryRecordStore};
use chrono::{Duration, Utc};
use clap::{Args, ValueEnum};
use renolead::assignment::AssignmentStrategy;
use renolead::config::DecisionConfig;
use renolead::domain::{ActorRole, ContactId, Request, RequestId};
use renolead::service::DecisionService;
use renolead::store::SystemClock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum StrategyArg {
    RoundRobin,
    WorkloadBalanced,
    SkillBased,
    Hybrid,
    Flexible,
}

impl From<StrategyArg> for AssignmentStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::RoundRobin => AssignmentStrategy::RoundRobin,
            StrategyArg::WorkloadBalanced => AssignmentStrategy::WorkloadBalanced,
            StrategyArg::SkillBased => AssignmentStrategy::SkillBased,
            StrategyArg::Hybrid => AssignmentStrategy::Hybrid,
            StrategyArg::Flexible => AssignmentStrategy::Flexible,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Assignment strategy used for the intake portion of the demo
    #[arg(long, value_enum)]
    pub(crate) strategy: Option<StrategyArg>,
    /// Skip the expiration and archival portion of the demo
    #[arg(long)]
    pub(crate) skip_lifecycle: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let strategy: AssignmentStrategy = args
        .strategy
        .map(Into::into)
        .unwrap_or(AssignmentStrategy::Hybrid);

    let store = Arc::new(InMemoryRecordStore::seeded());
    let dispatcher = Arc::new(InMemoryDispatcher::default());
    let service = DecisionService::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::new(SystemClock),
        DecisionConfig::default(),
    )?;

    println!("Lead decision engine demo");
    println!("Strategy: {}", strategy.label());

    println!("\nIntake and routing");
    for request in sample_leads() {
        store.insert_request(request.clone())?;
        let decision = match service.process_intake(&request, strategy) {
            Ok(decision) => decision,
            Err(err) => {
                println!("- {}: routing unavailable ({err})", request.id);
                continue;
            }
        };

        println!(
            "- {} | {} via {} | score {:.1} ({:?}) | priority {:?} | p(convert) {:.0}%",
            decision.request,
            request.product,
            request.source,
            decision.score.overall,
            decision.score.grade,
            decision.score.priority,
            decision.score.conversion_probability * 100.0
        );
        println!(
            "  assigned to {} via {} (score {:.2})",
            decision.selection.assignee.name,
            decision.selection.strategy.label(),
            decision.selection.score
        );
        for factor in &decision.score.factors {
            println!(
                "    {:?}: {:.0} x {:.2}",
                factor.kind, factor.score, factor.weight
            );
        }
        for recommendation in &decision.score.recommendations {
            println!("    > {}", recommendation);
        }
    }

    if args.skip_lifecycle {
        return Ok(());
    }

    println!("\nLifecycle enforcement");
    let stale = Request::new(
        RequestId("demo-stale".to_string()),
        "Google Ads",
        Utc::now() - Duration::days(20),
    );
    store.insert_request(stale)?;

    let warnings = service.lifecycle().check_expirations()?;
    println!(
        "- warning scan: {} active, {} at risk, {} warnings sent",
        warnings.scanned,
        warnings.at_risk.len(),
        warnings.warnings_sent
    );
    for assessment in &warnings.at_risk {
        println!(
            "  - {} ({}): {} days remaining, risk {}",
            assessment.request,
            assessment.source,
            assessment.days_remaining,
            assessment.risk.label()
        );
    }

    let sweep = service.lifecycle().process_automatic_expirations()?;
    println!(
        "- expiration sweep: {} scanned, {} auto-archived, {} flagged expired",
        sweep.scanned,
        sweep.archived.len(),
        sweep.expired.len()
    );

    println!("\nManual archive and reactivation");
    let target = RequestId("demo-kitchen".to_string());
    let archived = service.lifecycle().archive_lead(
        &target,
        "completed_won",
        None,
        ActorRole::Manager,
        "demo-manager",
    )?;
    println!("- {} archived: {}", target, last_note(&archived));

    let revived = service.lifecycle().reactivate_lead(
        &target,
        Some("homeowner re-engaged"),
        ActorRole::Manager,
        "demo-manager",
        None,
    )?;
    println!(
        "- {} reactivated (count {}): {}",
        target,
        revived.reactivation_count,
        last_note(&revived)
    );

    let events = dispatcher.events();
    if events.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications");
        for notification in events {
            let recipient = notification
                .recipient
                .map(|id| id.0)
                .unwrap_or_else(|| "team".to_string());
            println!("- to {}: {:?}", recipient, notification.event);
        }
    }

    Ok(())
}

fn last_note(request: &Request) -> String {
    request
        .notes
        .lines()
        .last()
        .unwrap_or_default()
        .to_string()
}

fn sample_leads() -> Vec<Request> {
    let now = Utc::now();

    let mut kitchen = Request::new(RequestId("demo-kitchen".to_string()), "Referral", now);
    kitchen.product = "Kitchen Renovation".to_string();
    kitchen.budget = Some("$85,000".to_string());
    kitchen.contact = Some(ContactId("demo-contact-1".to_string()));
    kitchen.address = Some("12 Harbor Rd".to_string());
    kitchen.city = Some("Greenwich".to_string());
    kitchen.state = Some("CT".to_string());
    kitchen.message = "We are planning a full kitchen renovation and would like a walk-thru as \
                       soon as possible to talk through layout and appliances."
        .to_string();
    kitchen.visit_requested = true;
    kitchen.attachment_count = 3;

    let mut bathroom = Request::new(RequestId("demo-bathroom".to_string()), "Website", now);
    bathroom.product = "Bathroom Remodel".to_string();
    bathroom.budget = Some("25k-40k".to_string());
    bathroom.city = Some("Scarsdale".to_string());
    bathroom.state = Some("NY".to_string());
    bathroom.message = "Looking to update the primary bath sometime this year.".to_string();

    let mut sparse = Request::new(RequestId("demo-sparse".to_string()), "Google Ads", now);
    sparse.message = "price?".to_string();

    vec![kitchen, bathroom, sparse]
}
