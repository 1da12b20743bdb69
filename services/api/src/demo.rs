use crate::infra::{InMemoryAllocationRepository, InMemoryNoticePublisher};
use chrono::SecondsFormat;
use clap::Args;
use station_alloc::allocation::{
    AllocationReport, AllocationRequest, AllocationService, ApplicantId, RejectionCause, Roster,
};
use station_alloc::config::AppConfig;
use station_alloc::error::AppError;
use station_alloc::import::{ImportError, RosterImporter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Station export
    /// (location,stipend,categories,cutoff,capacity,required_attributes,specialization)
    #[arg(long)]
    pub(crate) positions: PathBuf,
    /// Applicant export (id,name,score,category,attributes)
    #[arg(long)]
    pub(crate) applicants: PathBuf,
    /// Preference export (applicant_id,rank,location)
    #[arg(long)]
    pub(crate) preferences: PathBuf,
    /// Applicant id that withdraws before the first round (repeatable)
    #[arg(long)]
    pub(crate) withdraw: Vec<u32>,
    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the stored run as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs {
        positions,
        applicants,
        preferences,
        withdraw,
        json,
    } = args;

    let config = AppConfig::load()?;
    let mut request = RosterImporter::from_paths(positions, applicants, preferences)?;
    request.withdrawals = withdraw.into_iter().map(ApplicantId).collect();

    let mut engine = Roster::from_request(request)?
        .with_parallel_threshold(config.allocation.parallel_threshold);
    let report = engine.run()?;

    if json {
        print_json(&report);
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryAllocationRepository::default());
    let notices = Arc::new(InMemoryNoticePublisher::default());
    let service = AllocationService::new(repository, notices.clone(), Default::default());

    let record = match service.run(sample_request()?) {
        Ok(record) => record,
        Err(err) => {
            println!("Sample allocation failed: {}", err);
            return Ok(());
        }
    };

    if args.json {
        print_json(&record);
        return Ok(());
    }

    println!("Station allocation demo");
    println!(
        "- Run {} completed at {}",
        record.run_id.0,
        record
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    render_report(&record.report);

    let events = notices.events();
    if events.is_empty() {
        println!("\nAdmission notices: none dispatched");
    } else {
        println!("\nAdmission notices:");
        for notice in events {
            let track = notice
                .specialization
                .as_deref()
                .map(|tag| format!(" ({tag})"))
                .unwrap_or_default();
            println!(
                "  - {} -> {}{} | stipend {}",
                notice.name, notice.location, track, notice.stipend
            );
        }
    }

    Ok(())
}

/// Five sample stations, two of them specialized electronics labs.
const SAMPLE_POSITIONS: &str = "\
location,stipend,categories,cutoff,capacity,required_attributes,specialization
Bengaluru,32000,EE;ECE,8.0,1,lab-safety,VLSI
Chennai,26000,ECE,7.5,1,lab-safety;signals,Embedded
Hyderabad,24000,CS;IT,7.0,2,,
Pune,20000,CS;EE;ECE,6.5,2,,
Kolkata,18000,CS;IT;EE,6.0,1,,
";

const SAMPLE_APPLICANTS: &str = "\
id,name,score,category,attributes
101,Aarav Shah,9.2,EE,lab-safety
102,Diya Menon,8.7,ECE,lab-safety;signals
103,Kabir Rao,8.7,CS,
104,Ishita Verma,7.4,IT,
105,Rohan Iyer,9.6,CS,dbms
106,Sara Khan,6.1,EE,
107,Neel Joshi,7.9,ECE,signals
108,Tara Pillai,8.1,IT,
";

const SAMPLE_PREFERENCES: &str = "\
applicant_id,rank,location
101,1,Bengaluru
101,2,Pune
102,1,Bengaluru
102,2,Chennai
102,3,Pune
103,1,Hyderabad
103,2,Pune
104,1,Hyderabad
104,2,Kolkata
105,1,Hyderabad
105,2,Pune
106,1,Pune
106,2,Kolkata
107,1,Chennai
107,2,Pune
";

/// The built-in sample run. Student 103 withdraws before the first round.
pub(crate) fn sample_request() -> Result<AllocationRequest, ImportError> {
    let mut request = RosterImporter::from_readers(
        SAMPLE_POSITIONS.as_bytes(),
        SAMPLE_APPLICANTS.as_bytes(),
        SAMPLE_PREFERENCES.as_bytes(),
    )?;
    request.withdrawals.push(ApplicantId(103));
    Ok(request)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("JSON output unavailable: {}", err),
    }
}

pub(crate) fn render_report(report: &AllocationReport) {
    let counts = report.summary();
    println!(
        "Allocation settled after {} round(s): {} accepted | {} rejected | {} withdrawn",
        report.rounds, counts.accepted, counts.rejected, counts.withdrawn
    );

    println!("Stations:");
    for fill in &report.positions {
        let track = fill
            .specialization
            .as_deref()
            .map(|tag| format!(" [{tag}]"))
            .unwrap_or_default();
        let admitted = if fill.admitted.is_empty() {
            "none".to_string()
        } else {
            fill.admitted
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  - {}{}: {}/{} seats | stipend {} | admitted {}",
            fill.location, track, fill.held, fill.capacity, fill.stipend, admitted
        );
    }

    println!("Applicants:");
    for view in &report.applicants {
        let detail = match (&view.position, view.rejection) {
            (Some(location), _) => format!(" -> {location}"),
            (None, Some(RejectionCause::PreferencesExhausted)) => {
                " (no eligible preference left)".to_string()
            }
            (None, Some(RejectionCause::Caller)) => " (rejected by operator)".to_string(),
            (None, None) => String::new(),
        };
        println!(
            "  - #{} {} ({:.2}): {}{}",
            view.id, view.name, view.score, view.outcome, detail
        );
    }

    if let Some(last) = report.history.last() {
        println!(
            "Final round {}: {} proposals, {} admitted, {} outranked, {} ineligible",
            last.round, last.proposals, last.admitted, last.outranked, last.ineligible
        );
    }
}
