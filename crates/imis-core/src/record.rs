use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const STAMP_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(u64);

impl MemberId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MemberId {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(format!("not a member id: {input:?}"));
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|err| format!("member id {trimmed} out of range: {err}"))
    }
}

/// A `YYYYMMDD` stamp recorded when a member is drawn.
///
/// Stamps read from disk are kept verbatim so that a hand-edited history entry
/// survives a load/save cycle even when it is not a valid date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionDate(String);

impl SelectionDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(STAMP_FORMAT).to_string())
    }

    pub fn verbatim(stamp: impl Into<String>) -> Self {
        Self(stamp.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn date(&self) -> Option<NaiveDate> {
        if self.0.len() != 8 {
            return None;
        }
        NaiveDate::parse_from_str(&self.0, STAMP_FORMAT).ok()
    }

    pub fn is_well_formed(&self) -> bool {
        self.date().is_some()
    }
}

impl fmt::Display for SelectionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SelectionDate {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let stamp = Self::verbatim(input);
        match stamp.date() {
            Some(date) => Ok(Self::from_date(date)),
            None => Err(format!("expected a YYYYMMDD date, got {input:?}")),
        }
    }
}

impl From<NaiveDate> for SelectionDate {
    fn from(date: NaiveDate) -> Self {
        Self::from_date(date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: MemberId,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub selection_dates: Vec<SelectionDate>,
}

impl Record {
    pub fn new(id: MemberId) -> Self {
        Self {
            id,
            last_name: String::new(),
            first_name: String::new(),
            active: false,
            selection_dates: Vec::new(),
        }
    }

    pub fn with_names(
        mut self,
        last_name: impl Into<String>,
        first_name: impl Into<String>,
    ) -> Self {
        self.last_name = last_name.into();
        self.first_name = first_name.into();
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_selection_dates<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = SelectionDate>,
    {
        self.selection_dates = dates.into_iter().collect();
        self
    }

    pub fn has_been_selected(&self) -> bool {
        !self.selection_dates.is_empty()
    }

    pub fn is_eligible(&self) -> bool {
        self.active && !self.has_been_selected()
    }

    pub fn stamp(&mut self, date: NaiveDate) {
        self.selection_dates.push(SelectionDate::from_date(date));
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (false, false) => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// Active members first, then last name and first name ignoring case, then id.
pub fn roster_order(left: &Record, right: &Record) -> Ordering {
    right
        .active
        .cmp(&left.active)
        .then_with(|| cmp_ignore_case(&left.last_name, &right.last_name))
        .then_with(|| cmp_ignore_case(&left.first_name, &right.first_name))
        .then_with(|| left.id.cmp(&right.id))
}

fn cmp_ignore_case(left: &str, right: &str) -> Ordering {
    left.to_lowercase().cmp(&right.to_lowercase())
}
