use crate::config::{resolve_backup, resolve_count, resolve_roster_path, ImisConfig};
use crate::lock::RosterLock;
use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use imis_core::{select_members, MergeReport, Record, RosterStats, SelectionDate, STAMP_FORMAT};
use imis_storage::RosterStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
pub enum Command {
    /// Draw members who have never been selected and stamp them with the date
    Select(SelectArgs),
    /// Reconcile the roster with a current-membership export
    Merge(MergeArgs),
    /// Print roster counts
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[arg(long, value_name = "PATH")]
    pub roster: Option<PathBuf>,
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
    #[arg(long, value_name = "YYYYMMDD", value_parser = parse_stamp_date)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[arg(long, value_name = "PATH")]
    pub roster: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub snapshot: PathBuf,
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub json: bool,
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long, value_name = "PATH")]
    pub roster: Option<PathBuf>,
    #[arg(long)]
    pub json: bool,
}

pub fn handle_command(command: Command, config: &ImisConfig) -> Result<()> {
    match command {
        Command::Select(args) => select(&args, config),
        Command::Merge(args) => merge(&args, config),
        Command::Stats(args) => stats(&args, config),
    }
}

fn parse_stamp_date(value: &str) -> Result<NaiveDate, String> {
    let stamp = value.parse::<SelectionDate>()?;
    stamp
        .date()
        .ok_or_else(|| format!("expected a YYYYMMDD date, got {value:?}"))
}

fn store_for(roster_path: Option<&Path>, backup: bool) -> RosterStore {
    match roster_path {
        Some(path) => RosterStore::at(path),
        None => RosterStore::new(),
    }
    .with_backup(backup)
}

fn select(args: &SelectArgs, config: &ImisConfig) -> Result<()> {
    let roster_path = resolve_roster_path(args.roster.as_deref(), config);
    let count = resolve_count(args.count, config)?;
    let store = store_for(roster_path.as_deref(), resolve_backup(args.no_backup, config));

    let _lock = match roster_path.as_deref() {
        Some(path) if !args.dry_run => Some(RosterLock::acquire(path)?),
        _ => None,
    };

    let mut roster = store.read(None)?;
    let before = roster.stats();
    if !args.json {
        print_stats(&before);
        println!();
    }

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let chosen = select_members(&mut roster, count, today, &mut rng)?;

    // The draw is recorded before it is announced.
    let written = if args.dry_run {
        None
    } else {
        Some(store.write(&roster, None)?)
    };
    let selected: Vec<&Record> = chosen.iter().filter_map(|id| roster.get(*id)).collect();

    if args.json {
        let payload = json!({
            "date": today.format(STAMP_FORMAT).to_string(),
            "dryRun": args.dry_run,
            "stats": before,
            "selected": selected,
            "saved": written.as_ref().map(|path| path.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Selected {} member(s) on {}:", selected.len(), today.format(STAMP_FORMAT));
    for record in &selected {
        println!("{}", selection_line(record));
    }
    match written {
        Some(path) => println!("Roster saved to {}", path.display()),
        None => println!("Dry run: roster not saved."),
    }
    Ok(())
}

fn merge(args: &MergeArgs, config: &ImisConfig) -> Result<()> {
    let roster_path = resolve_roster_path(args.roster.as_deref(), config);
    let store = store_for(roster_path.as_deref(), resolve_backup(args.no_backup, config));

    let mut lock_targets: Vec<&Path> = roster_path.iter().map(PathBuf::as_path).collect();
    if let Some(output) = args.output.as_deref() {
        if !lock_targets.contains(&output) {
            lock_targets.push(output);
        }
    }
    let _locks = lock_targets
        .into_iter()
        .map(RosterLock::acquire)
        .collect::<Result<Vec<_>>>()?;

    let existing = store.read(None)?;
    let (merged, report) = store.merge_snapshot(existing, &args.snapshot)?;
    let written = store.write(&merged, args.output.as_deref())?;

    if args.json {
        let payload = json!({
            "output": written.display().to_string(),
            "report": report,
            "stats": merged.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_merge_report(&report);
        println!("Merged roster written to {}", written.display());
    }
    Ok(())
}

fn stats(args: &StatsArgs, config: &ImisConfig) -> Result<()> {
    let roster_path = resolve_roster_path(args.roster.as_deref(), config);
    let roster = store_for(roster_path.as_deref(), true).read(None)?;
    let stats = roster.stats();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn selection_line(record: &Record) -> String {
    format!(
        "{:>8} {} {}",
        record.id, record.first_name, record.last_name
    )
    .trim_end()
    .to_string()
}

fn stats_lines(stats: &RosterStats) -> Vec<String> {
    [
        ("Total number of members:", stats.total),
        ("Active members:", stats.active),
        ("Inactive members:", stats.inactive),
        ("Inactive members previously selected:", stats.inactive_selected),
        ("Active members never selected:", stats.unselected),
        ("Active members previously selected:", stats.selected),
    ]
    .iter()
    .map(|(label, value)| format!("{label:<40}{value:>6}"))
    .collect()
}

fn print_stats(stats: &RosterStats) {
    for line in stats_lines(stats) {
        println!("{line}");
    }
}

fn print_merge_report(report: &MergeReport) {
    println!("Still active:      {:>6}", report.retained);
    println!("Reactivated:       {:>6}", report.reactivated);
    println!("New members:       {:>6}", report.added);
    println!("New inactive:      {:>6}", report.added_inactive);
    println!("Now inactive:      {:>6}", report.deactivated);
    println!("Names corrected:   {:>6}", report.renamed);
}
