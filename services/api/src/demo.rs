use crate::cli::DataArgs;
use crate::infra::{in_memory_stores, load_dataset, parse_role, InMemoryCompletionNotifier};
use clap::Args;
use shelter_rescue::config::{AppConfig, DispatchConfig};
use shelter_rescue::error::AppError;
use shelter_rescue::workflows::rescue::{
    AssignmentRole, CompletionOutcome, DispatchCoordinator, RankedRescue, RescueAssignment,
    RescueError, ReportId, VolunteerId,
};
use std::sync::Barrier;

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// Volunteer to rank open rescues for
    #[arg(long)]
    pub(crate) volunteer: String,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct ClaimArgs {
    /// Report to claim
    #[arg(long)]
    pub(crate) report: String,
    /// Volunteer making the claim
    #[arg(long)]
    pub(crate) volunteer: String,
    /// PRIMARY, BACKUP, TRANSPORT or MEDICAL
    #[arg(long, default_value = "PRIMARY", value_parser = parse_role)]
    pub(crate) role: AssignmentRole,
    /// Free-form note shown to coordinators
    #[arg(long, default_value = "")]
    pub(crate) notes: String,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of volunteers racing for the same report in the simulated race
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u16).range(2..=64))]
    pub(crate) contenders: u16,
}

fn coordinator_for(
    data: &DataArgs,
) -> Result<(DispatchCoordinator, InMemoryCompletionNotifier), AppError> {
    let config = AppConfig::load()?;
    let dataset = load_dataset(data.reports_csv.as_deref(), data.volunteers_csv.as_deref())?;
    let (stores, notifier) = in_memory_stores(dataset);
    Ok((DispatchCoordinator::new(stores, &config.dispatch), notifier))
}

pub(crate) fn run_list(args: ListArgs) -> Result<(), AppError> {
    let (coordinator, _) = coordinator_for(&args.data)?;
    let listing = coordinator.list_open_rescues(&VolunteerId(args.volunteer.clone()))?;

    println!("Open rescues for {}", args.volunteer);
    if listing.is_empty() {
        println!("- none");
    }
    for entry in &listing {
        render_ranked(entry);
    }
    Ok(())
}

pub(crate) fn run_claim(args: ClaimArgs) -> Result<(), AppError> {
    let (coordinator, _) = coordinator_for(&args.data)?;
    let assignment = coordinator.accept_rescue(
        &ReportId(args.report),
        &VolunteerId(args.volunteer),
        args.role,
        &args.notes,
    )?;

    match serde_json::to_string_pretty(&assignment) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("Assignment {} accepted ({err})", assignment.id),
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let dataset = load_dataset(None, None)?;
    let (stores, notifier) = in_memory_stores(dataset);
    let coordinator = DispatchCoordinator::new(stores, &DispatchConfig::default());

    let avery = VolunteerId("vol-avery".to_string());
    let blake = VolunteerId("vol-blake".to_string());
    let casey = VolunteerId("vol-casey".to_string());
    let dog = ReportId("rpt-1001".to_string());
    let kitten = ReportId("rpt-1002".to_string());
    let horse = ReportId("rpt-1003".to_string());

    println!("Rescue dispatch demo");
    println!("\nOpen rescues for {avery}");
    for entry in coordinator.list_open_rescues(&avery)? {
        render_ranked(&entry);
    }

    println!("\n1. {avery} claims {dog}");
    let first =
        coordinator.accept_rescue(&dog, &avery, AssignmentRole::Primary, "Ten minutes out")?;
    render_assignment(&first);

    println!("\n2. {blake} tries the same report");
    report_refusal(coordinator.accept_rescue(&dog, &blake, AssignmentRole::Backup, ""));

    println!("\n3. {casey} tries the loose horse without training");
    report_refusal(coordinator.accept_rescue(&horse, &casey, AssignmentRole::Primary, ""));

    println!("\n4. {avery} starts, then cannot capture");
    coordinator.start_rescue(&first.id, &avery)?;
    let attempt = coordinator.complete_rescue(
        &first.id,
        CompletionOutcome::UnableToCapture,
        "Dog bolted under the overpass fence",
    )?;
    render_assignment(&attempt);

    println!("\n5. Report reopens; {blake} takes it and resolves it");
    let second = coordinator.accept_rescue(
        &dog,
        &blake,
        AssignmentRole::Primary,
        "Bringing a slip lead",
    )?;
    coordinator.start_rescue(&second.id, &blake)?;
    let resolved = coordinator.complete_rescue(
        &second.id,
        CompletionOutcome::Success,
        "Secured and transported to intake",
    )?;
    render_assignment(&resolved);
    report_refusal(coordinator.accept_rescue(&dog, &casey, AssignmentRole::Primary, ""));
    println!("  History for {dog}:");
    for entry in coordinator.assignment_history(&dog)? {
        println!(
            "    - {} {} by {}",
            entry.id,
            entry.status.label(),
            entry.volunteer_id
        );
    }

    println!("\n6. {casey} claims {kitten}, then cancels");
    let kitten_claim = coordinator.accept_rescue(&kitten, &casey, AssignmentRole::Primary, "")?;
    let cancelled = coordinator.cancel_rescue(&kitten_claim.id, "Car would not start")?;
    render_assignment(&cancelled);

    println!("\n7. Refreshing qualifications for {avery}");
    let summary = coordinator.refresh_qualifications(&avery)?;
    println!(
        "  re-evaluated {} open reports, dropped {} cached results",
        summary.updated_count, summary.invalidated_count
    );

    println!(
        "\n8. Simulated race: {} volunteers claim {kitten} at once",
        args.contenders
    );
    let outcomes = race(&coordinator, &kitten, usize::from(args.contenders));
    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .collect();
    let already_claimed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(RescueError::AlreadyClaimed { .. })))
        .count();
    println!(
        "  winners: {} | already claimed: {} | other failures: {}",
        winners.len(),
        already_claimed,
        outcomes.len() - winners.len() - already_claimed
    );
    for winner in winners {
        println!("  {} won the race as {}", winner.volunteer_id, winner.id);
    }

    let notices = notifier.notices();
    println!(
        "\nCompletion notices sent to the points service: {}",
        notices.len()
    );
    for notice in notices {
        println!(
            "  - {} ({}) -> {}",
            notice.assignment_id,
            notice.volunteer_id,
            notice.outcome.label()
        );
    }

    Ok(())
}

fn race(
    coordinator: &DispatchCoordinator,
    report: &ReportId,
    contenders: usize,
) -> Vec<Result<RescueAssignment, RescueError>> {
    let barrier = Barrier::new(contenders);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..contenders)
            .map(|index| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let volunteer = VolunteerId(RACERS[index % RACERS.len()].to_string());
                    barrier.wait();
                    coordinator.accept_rescue(report, &volunteer, AssignmentRole::Primary, "")
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    })
}

const RACERS: [&str; 4] = ["vol-avery", "vol-blake", "vol-casey", "vol-devon"];

fn render_ranked(entry: &RankedRescue) {
    let distance = entry
        .distance_km
        .map(|km| format!("{km:.1} km"))
        .unwrap_or_else(|| "distance unknown".to_string());
    println!(
        "- #{} [{}] {} {} ({}) | {} | score {} | {} min old | {}",
        entry.priority_rank,
        entry.report.urgency.label(),
        entry.report.id,
        entry.report.animal_type,
        entry.report.condition,
        entry.qualification.tier.label(),
        entry.priority_score,
        entry.age_minutes,
        distance
    );
    println!("  {}", entry.qualification.message);
}

fn render_assignment(assignment: &RescueAssignment) {
    let outcome = assignment
        .outcome
        .map(|outcome| format!(" ({})", outcome.label()))
        .unwrap_or_default();
    println!(
        "  {} {} for {} by {}{}",
        assignment.id,
        assignment.status.label(),
        assignment.report_id,
        assignment.volunteer_id,
        outcome
    );
}

fn report_refusal(outcome: Result<RescueAssignment, RescueError>) {
    match outcome {
        Ok(assignment) => render_assignment(&assignment),
        Err(err) => println!("  refused [{}]: {}", err.code(), err),
    }
}
