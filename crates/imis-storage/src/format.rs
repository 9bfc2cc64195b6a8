use imis_core::{MemberId, Record, Roster, RosterError, SelectionDate};
use tracing::{debug, warn};

pub const DELIMITER: &str = ",";
pub const DATE_SEPARATOR: &str = ":";
pub const HEADER: [&str; 5] = ["iMIS", "Last Name", "First Name", "Active", "Dates Selected"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub rows: usize,
    pub skipped_rows: usize,
    pub duplicate_ids: Vec<MemberId>,
    pub malformed_stamps: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnMap {
    id: usize,
    last_name: Option<usize>,
    first_name: Option<usize>,
    active: Option<usize>,
    dates_selected: Option<usize>,
    legacy_selected: Vec<usize>,
}

fn normalize_heading(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn resolve_columns(header_line: &str, origin: &str) -> Result<ColumnMap, RosterError> {
    let headings: Vec<String> = header_line.split(DELIMITER).map(normalize_heading).collect();
    let find = |names: &[&str]| {
        headings
            .iter()
            .position(|heading| names.contains(&heading.as_str()))
    };

    let id = find(&["id", "imis"]).ok_or_else(|| {
        RosterError::invalid_format(origin, "header row has no id or iMIS column")
    })?;

    let mut legacy: Vec<(u32, usize)> = headings
        .iter()
        .enumerate()
        .filter_map(|(idx, heading)| {
            heading
                .strip_prefix("selected ")
                .and_then(|ordinal| ordinal.trim().parse::<u32>().ok())
                .map(|ordinal| (ordinal, idx))
        })
        .collect();
    legacy.sort();

    Ok(ColumnMap {
        id,
        last_name: find(&["last name"]),
        first_name: find(&["first name"]),
        active: find(&["active"]),
        dates_selected: find(&["dates selected"]),
        legacy_selected: legacy.into_iter().map(|(_, idx)| idx).collect(),
    })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// Parses the delimiter-separated roster layout.
///
/// The first non-blank line is the header. A file without an `Active` column
/// is a membership export, so every row in it is active.
pub fn parse_roster(content: &str, origin: &str) -> Result<(Roster, ParseReport), RosterError> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| RosterError::invalid_format(origin, "file has no header row"))?;
    let columns = resolve_columns(header, origin)?;

    let mut roster = Roster::new();
    let mut report = ParseReport::default();

    for line in lines {
        let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        let field = |idx: Option<usize>| idx.and_then(|idx| fields.get(idx).copied()).unwrap_or("");

        let raw_id = field(Some(columns.id));
        let id = match raw_id.parse::<MemberId>() {
            Ok(id) => id,
            Err(reason) => {
                debug!(origin, line = %line, %reason, "skipping row without a member id");
                report.skipped_rows += 1;
                continue;
            }
        };
        report.rows += 1;

        let active = match columns.active {
            Some(idx) => is_truthy(field(Some(idx))),
            None => true,
        };

        let mut stamps: Vec<SelectionDate> = field(columns.dates_selected)
            .split(DATE_SEPARATOR)
            .filter(|token| !token.trim().is_empty())
            .map(SelectionDate::verbatim)
            .collect();
        stamps.extend(
            columns
                .legacy_selected
                .iter()
                .map(|idx| field(Some(*idx)))
                .filter(|value| !value.is_empty())
                .map(SelectionDate::verbatim),
        );
        for stamp in stamps.iter().filter(|stamp| !stamp.is_well_formed()) {
            warn!(
                origin,
                %id,
                stamp = %stamp,
                "selection stamp is not a YYYYMMDD date, kept as written"
            );
            report.malformed_stamps += 1;
        }

        let record = Record::new(id)
            .with_names(field(columns.last_name), field(columns.first_name))
            .with_active(active)
            .with_selection_dates(stamps);

        if let Err(duplicate) = roster.insert(record) {
            warn!(origin, id = %duplicate.id, "duplicate member id, keeping the first row");
            report.duplicate_ids.push(duplicate.id);
        }
    }

    Ok((roster, report))
}

fn check_field<'a>(
    value: &'a str,
    id: MemberId,
    what: &str,
    origin: &str,
) -> Result<&'a str, RosterError> {
    if value.contains(DELIMITER) || value.contains('\n') || value.contains('\r') {
        return Err(RosterError::invalid_format(
            origin,
            format!("member {id} has a {what} containing a delimiter or line break"),
        ));
    }
    Ok(value)
}

/// Renders active members first, then inactive, each group in roster order.
/// `origin` names the destination in any error.
pub fn render_roster(roster: &Roster, origin: &str) -> Result<String, RosterError> {
    let mut out = HEADER.join(DELIMITER);
    out.push('\n');

    for record in roster.in_roster_order() {
        let mut stamps = Vec::with_capacity(record.selection_dates.len());
        for stamp in &record.selection_dates {
            let value = check_field(stamp.as_str(), record.id, "selection stamp", origin)?;
            if value.contains(DATE_SEPARATOR) {
                return Err(RosterError::invalid_format(
                    origin,
                    format!("member {} has a selection stamp containing ':'", record.id),
                ));
            }
            stamps.push(value);
        }
        let row = [
            record.id.to_string(),
            check_field(&record.last_name, record.id, "last name", origin)?.to_string(),
            check_field(&record.first_name, record.id, "first name", origin)?.to_string(),
            if record.active { "1" } else { "0" }.to_string(),
            stamps.join(DATE_SEPARATOR),
        ];
        out.push_str(&row.join(DELIMITER));
        out.push('\n');
    }

    Ok(out)
}
