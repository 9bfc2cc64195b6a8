use crate::error::RosterError;
use crate::record::{MemberId, Record};
use crate::roster::Roster;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub retained: usize,
    pub reactivated: usize,
    pub added: usize,
    pub added_inactive: usize,
    pub deactivated: usize,
    pub renamed: usize,
}

pub fn merge(existing: Roster, snapshot: &Roster) -> Result<Roster, RosterError> {
    merge_with_report(existing, snapshot).map(|(merged, _)| merged)
}

/// Folds the snapshot's active members into `existing`.
///
/// Members absent from the snapshot are demoted, never removed, and no
/// selection history is ever taken from the snapshot.
pub fn merge_with_report(
    existing: Roster,
    snapshot: &Roster,
) -> Result<(Roster, MergeReport), RosterError> {
    if existing.source().is_none() {
        return Err(RosterError::MissingSource);
    }

    let mut merged = existing;
    let mut report = MergeReport::default();

    let mut previously_active: BTreeSet<MemberId> = BTreeSet::new();
    for record in merged.iter_mut().filter(|record| record.active) {
        record.active = false;
        previously_active.insert(record.id);
    }

    // Snapshot iteration is ascending by id.
    for incoming in snapshot.active() {
        match merged.get_mut(incoming.id) {
            Some(current) => {
                current.active = true;
                if previously_active.contains(&incoming.id) {
                    report.retained += 1;
                } else {
                    report.reactivated += 1;
                }
                if apply_name_corrections(current, incoming) {
                    report.renamed += 1;
                }
            }
            None => {
                let fresh = Record::new(incoming.id)
                    .with_names(incoming.last_name.clone(), incoming.first_name.clone())
                    .with_active(true);
                if merged.insert(fresh).is_ok() {
                    report.added += 1;
                }
            }
        }
    }

    for incoming in snapshot.inactive() {
        if merged.contains(incoming.id) {
            continue;
        }
        let fresh = Record::new(incoming.id)
            .with_names(incoming.last_name.clone(), incoming.first_name.clone());
        if merged.insert(fresh).is_ok() {
            report.added_inactive += 1;
        }
    }

    report.deactivated = previously_active.len() - report.retained;

    info!(
        retained = report.retained,
        reactivated = report.reactivated,
        added = report.added,
        added_inactive = report.added_inactive,
        deactivated = report.deactivated,
        renamed = report.renamed,
        "roster merged with snapshot"
    );

    Ok((merged, report))
}

fn apply_name_corrections(current: &mut Record, incoming: &Record) -> bool {
    let mut changed = false;
    if !incoming.last_name.is_empty() && incoming.last_name != current.last_name {
        if !current.last_name.is_empty() {
            warn!(
                id = %current.id,
                previous = %current.last_name,
                corrected = %incoming.last_name,
                "last name replaced by snapshot"
            );
        }
        current.last_name = incoming.last_name.clone();
        changed = true;
    }
    if !incoming.first_name.is_empty() && incoming.first_name != current.first_name {
        if !current.first_name.is_empty() {
            warn!(
                id = %current.id,
                previous = %current.first_name,
                corrected = %incoming.first_name,
                "first name replaced by snapshot"
            );
        }
        current.first_name = incoming.first_name.clone();
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::record::SelectionDate;

    fn id(value: u64) -> MemberId {
        MemberId::new(value)
    }

    fn member(value: u64, last: &str, first: &str, active: bool, stamps: &[&str]) -> Record {
        Record::new(id(value))
            .with_names(last, first)
            .with_active(active)
            .with_selection_dates(stamps.iter().map(|stamp| SelectionDate::verbatim(*stamp)))
    }

    fn roster_of(source: Option<&str>, records: Vec<Record>) -> Roster {
        let mut roster = match source {
            Some(path) => Roster::with_source(path),
            None => Roster::new(),
        };
        for record in records {
            roster.insert(record).expect("unique ids");
        }
        roster
    }

    fn snapshot_of_active(roster: &Roster) -> Roster {
        roster_of(None, roster.active().cloned().collect())
    }

    fn sample_roster() -> Roster {
        roster_of(
            Some("roster.csv"),
            vec![
                member(1, "Smith", "Jane", true, &[]),
                member(2, "Lee", "Kim", true, &["20240101"]),
                member(3, "Brown", "Ola", false, &["20230101", "20230601"]),
                member(4, "Ng", "Tam", false, &[]),
            ],
        )
    }

    #[test]
    fn merge_of_own_active_partition_is_identity() {
        let roster = sample_roster();
        let snapshot = snapshot_of_active(&roster);
        let (merged, report) = merge_with_report(roster.clone(), &snapshot).expect("merge");
        assert_eq!(merged, roster);
        assert_eq!(report.retained, 2);
        assert_eq!(report.deactivated, 0);
        assert_eq!(report.renamed, 0);
    }

    #[test]
    fn dropped_member_is_demoted_and_returning_member_keeps_history() {
        let existing = roster_of(
            Some("roster.csv"),
            vec![
                member(10, "Smith", "Jane", true, &[]),
                member(11, "Lee", "Kim", false, &["20230101"]),
            ],
        );
        let snapshot = roster_of(None, vec![member(11, "Lee", "Kim", true, &[])]);

        let (merged, report) = merge_with_report(existing, &snapshot).expect("merge");

        let jane = merged.get(id(10)).expect("10 kept");
        assert!(!jane.active);
        assert!(jane.selection_dates.is_empty());
        let kim = merged.get(id(11)).expect("11 kept");
        assert!(kim.active);
        assert_eq!(kim.selection_dates, vec![SelectionDate::verbatim("20230101")]);
        assert_eq!(report.deactivated, 1);
        assert_eq!(report.reactivated, 1);
    }

    #[test]
    fn id_alone_identifies_member_even_when_names_differ() {
        let existing = roster_of(
            Some("roster.csv"),
            vec![member(20, "Old", "Name", false, &["20220202"])],
        );
        let snapshot = roster_of(None, vec![member(20, "Totally", "Different", true, &[])]);

        let (merged, report) = merge_with_report(existing, &snapshot).expect("merge");

        assert_eq!(merged.len(), 1);
        let record = merged.get(id(20)).expect("present");
        assert!(record.active);
        assert_eq!(record.last_name, "Totally");
        assert_eq!(record.first_name, "Different");
        assert_eq!(record.selection_dates, vec![SelectionDate::verbatim("20220202")]);
        assert_eq!(report.renamed, 1);
    }

    #[test]
    fn blank_snapshot_names_do_not_erase_known_names() {
        let existing = roster_of(Some("roster.csv"), vec![member(5, "Khan", "Ria", true, &[])]);
        let snapshot = roster_of(None, vec![member(5, "", "", true, &[])]);

        let merged = merge(existing, &snapshot).expect("merge");

        let record = merged.get(id(5)).expect("present");
        assert_eq!(record.last_name, "Khan");
        assert_eq!(record.first_name, "Ria");
    }

    #[test]
    fn history_never_flows_from_snapshot() {
        let existing = roster_of(Some("roster.csv"), vec![member(7, "Yu", "Li", false, &[])]);
        let snapshot = roster_of(
            None,
            vec![
                member(7, "Yu", "Li", true, &["19990101"]),
                member(8, "Ito", "Mei", true, &["19990101"]),
            ],
        );

        let (merged, report) = merge_with_report(existing, &snapshot).expect("merge");

        assert!(merged.get(id(7)).expect("7").selection_dates.is_empty());
        let newcomer = merged.get(id(8)).expect("8 added");
        assert!(newcomer.active);
        assert!(newcomer.selection_dates.is_empty());
        assert_eq!(newcomer.last_name, "Ito");
        assert_eq!(report.added, 1);
    }

    #[test]
    fn partitions_stay_disjoint_and_cover_both_inputs() {
        let existing = sample_roster();
        let snapshot = roster_of(
            None,
            vec![
                member(2, "Lee", "Kim", true, &[]),
                member(4, "Ng", "Tam", true, &[]),
                member(9, "New", "Comer", true, &[]),
                member(12, "Lapsed", "Only", false, &[]),
            ],
        );
        let expected_union: BTreeSet<MemberId> =
            existing.ids().union(&snapshot.ids()).copied().collect();

        let (merged, report) = merge_with_report(existing, &snapshot).expect("merge");

        let active = merged.active_ids();
        let inactive = merged.inactive_ids();
        assert!(active.is_disjoint(&inactive));
        assert_eq!(
            active.union(&inactive).copied().collect::<BTreeSet<_>>(),
            expected_union
        );
        assert_eq!(active, snapshot.active_ids());
        assert_eq!(report.added_inactive, 1);
        assert_eq!(report.deactivated, 1);
    }

    #[test]
    fn history_is_preserved_for_every_existing_member() {
        let existing = sample_roster();
        let before: Vec<(MemberId, Vec<SelectionDate>)> = existing
            .iter()
            .map(|record| (record.id, record.selection_dates.clone()))
            .collect();
        let snapshot = roster_of(None, vec![member(3, "Brown", "Ola", true, &[])]);

        let merged = merge(existing, &snapshot).expect("merge");

        for (member_id, dates) in before {
            let after = &merged.get(member_id).expect("never removed").selection_dates;
            assert!(after.starts_with(&dates));
        }
    }

    #[test]
    fn merge_without_baseline_source_is_missing_source() {
        let existing = roster_of(None, vec![member(1, "A", "B", true, &[])]);
        let snapshot = roster_of(None, vec![member(1, "A", "B", true, &[])]);
        let err = merge(existing, &snapshot).expect_err("no baseline");
        assert_eq!(err.kind(), ErrorKind::MissingSource);
    }

    #[test]
    fn empty_snapshot_demotes_everyone() {
        let existing = sample_roster();
        let total = existing.len();
        let merged = merge(existing, &Roster::new()).expect("merge");
        assert_eq!(merged.len(), total);
        assert_eq!(merged.active().count(), 0);
    }
}
