mod format;

pub use format::{parse_roster, render_roster, ParseReport, DATE_SEPARATOR, DELIMITER, HEADER};

use imis_core::{merge_with_report, MergeReport, Roster, RosterError};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BACKUP_SUFFIX: &str = ".bak";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct RosterStore {
    path: Option<PathBuf>,
    backup: bool,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self {
            path: None,
            backup: true,
        }
    }
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn read(&self, path: Option<&Path>) -> Result<Roster, RosterError> {
        self.read_with_report(path).map(|(roster, _)| roster)
    }

    pub fn read_with_report(
        &self,
        path: Option<&Path>,
    ) -> Result<(Roster, ParseReport), RosterError> {
        let path = path
            .or(self.path.as_deref())
            .ok_or(RosterError::MissingSource)?;
        let bytes = fs::read(path).map_err(|err| RosterError::io(path, err))?;
        let origin = path.display().to_string();
        let content = String::from_utf8(bytes)
            .map_err(|_| RosterError::invalid_format(&origin, "file is not UTF-8 text"))?;

        let (mut roster, report) = parse_roster(&content, &origin)?;
        roster.set_source(path);
        if report.skipped_rows > 0 || !report.duplicate_ids.is_empty() {
            warn!(
                path = %origin,
                skipped_rows = report.skipped_rows,
                duplicate_ids = report.duplicate_ids.len(),
                "roster read with rows dropped"
            );
        }
        debug!(path = %origin, members = roster.len(), "roster read");
        Ok((roster, report))
    }

    /// Writes the roster and returns the path written.
    ///
    /// The destination is resolved from `path`, then the store's path, then
    /// the roster's own source. The new content lands in a sibling temp file
    /// that replaces the destination only once fully written.
    pub fn write(&self, roster: &Roster, path: Option<&Path>) -> Result<PathBuf, RosterError> {
        let target = path
            .or(self.path.as_deref())
            .or(roster.source())
            .ok_or(RosterError::MissingSource)?
            .to_path_buf();
        let payload = render_roster(roster, &target.display().to_string())?;

        if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| RosterError::io(parent, err))?;
        }

        if self.backup && target.exists() {
            let backup_path = sibling_with_suffix(&target, BACKUP_SUFFIX)?;
            fs::copy(&target, &backup_path).map_err(|err| RosterError::io(&backup_path, err))?;
            debug!(backup = %backup_path.display(), "previous roster backed up");
        }

        let tmp_path = sibling_with_suffix(&target, TEMP_SUFFIX)?;
        if let Err(err) = write_synced(&tmp_path, payload.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RosterError::io(&tmp_path, err));
        }
        if let Err(err) = fs::rename(&tmp_path, &target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RosterError::io(&target, err));
        }

        info!(path = %target.display(), members = roster.len(), "roster written");
        Ok(target)
    }

    /// Reads the snapshot at `snapshot_path` and reconciles `existing` with it.
    pub fn merge_snapshot(
        &self,
        existing: Roster,
        snapshot_path: &Path,
    ) -> Result<(Roster, MergeReport), RosterError> {
        if existing.source().is_none() {
            return Err(RosterError::MissingSource);
        }
        let snapshot = self.read(Some(snapshot_path))?;
        merge_with_report(existing, &snapshot)
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> Result<PathBuf, RosterError> {
    let file_name = path.file_name().ok_or_else(|| {
        RosterError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "roster path has no file name"),
        )
    })?;
    let mut name = file_name.to_os_string();
    name.push(suffix);
    Ok(path.with_file_name(name))
}

fn write_synced(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(payload)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imis_core::{ErrorKind, MemberId, Record, SelectionDate};
    use tempfile::tempdir;

    fn sample_roster() -> Roster {
        let mut roster = Roster::new();
        roster
            .insert(
                Record::new(MemberId::new(1))
                    .with_names("Smith", "Jane")
                    .with_active(true),
            )
            .expect("insert");
        roster
            .insert(
                Record::new(MemberId::new(2))
                    .with_names("Lee", "Kim")
                    .with_selection_dates([SelectionDate::verbatim("20230101")]),
            )
            .expect("insert");
        roster
    }

    #[test]
    fn read_without_any_path_is_missing_source() {
        let err = RosterStore::new().read(None).expect_err("no path");
        assert_eq!(err.kind(), ErrorKind::MissingSource);
    }

    #[test]
    fn write_without_any_path_is_missing_source() {
        let err = RosterStore::new()
            .write(&sample_roster(), None)
            .expect_err("no path");
        assert_eq!(err.kind(), ErrorKind::MissingSource);
    }

    #[test]
    fn read_of_nonexistent_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = RosterStore::at(dir.path().join("nosuchfile.csv"))
            .read(None)
            .expect_err("missing file");
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn read_of_binary_file_is_invalid_format() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("data.bin");
        fs::write(&path, [0xffu8, 0xfe, 0x00, 0x9f]).expect("write");
        let err = RosterStore::new()
            .read(Some(path.as_path()))
            .expect_err("not text");
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn write_then_read_returns_same_members_with_source() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("roster.csv");
        let store = RosterStore::at(&path);

        let written = store.write(&sample_roster(), None).expect("write");
        assert_eq!(written, path);

        let roster = store.read(None).expect("read");
        assert_eq!(roster.source(), Some(path.as_path()));
        assert_eq!(roster.ids(), sample_roster().ids());
        assert!(!dir.path().join("roster.csv.tmp").exists());
    }

    #[test]
    fn write_falls_back_to_roster_source() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("from-source.csv");
        let mut roster = sample_roster();
        roster.set_source(&path);

        RosterStore::new().write(&roster, None).expect("write");

        assert!(path.exists());
    }

    #[test]
    fn overwrite_keeps_backup_of_previous_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("roster.csv");
        fs::write(&path, "iMIS\n99\n").expect("seed");

        RosterStore::at(&path)
            .write(&sample_roster(), None)
            .expect("write");

        let backup = fs::read_to_string(dir.path().join("roster.csv.bak")).expect("backup");
        assert_eq!(backup, "iMIS\n99\n");
        let current = fs::read_to_string(&path).expect("current");
        assert!(current.starts_with("iMIS,Last Name,First Name,Active,Dates Selected\n"));
    }

    #[test]
    fn backup_can_be_disabled() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("roster.csv");
        fs::write(&path, "iMIS\n99\n").expect("seed");

        RosterStore::at(&path)
            .with_backup(false)
            .write(&sample_roster(), None)
            .expect("write");

        assert!(!dir.path().join("roster.csv.bak").exists());
    }

    #[test]
    fn failed_render_leaves_existing_file_untouched() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("roster.csv");
        fs::write(&path, "iMIS\n99\n").expect("seed");
        let mut roster = Roster::new();
        roster
            .insert(Record::new(MemberId::new(3)).with_names("Comma, Inc", ""))
            .expect("insert");

        let err = RosterStore::at(&path)
            .write(&roster, None)
            .expect_err("render fails");

        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(err.to_string().contains(&path.display().to_string()));
        assert_eq!(fs::read_to_string(&path).expect("read"), "iMIS\n99\n");
    }

    #[test]
    fn write_under_a_regular_file_is_io_error() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("plain.txt");
        fs::write(&blocker, "not a directory").expect("seed");
        let path = blocker.join("roster.csv");

        let err = RosterStore::at(&path)
            .write(&sample_roster(), None)
            .expect_err("parent is a file");

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(
            fs::read_to_string(&blocker).expect("read"),
            "not a directory"
        );
        assert!(!dir.path().join("plain.txt.tmp").exists());
    }

    #[test]
    fn write_onto_a_directory_is_io_error_and_cleans_up() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("roster.csv");
        fs::create_dir(&path).expect("dir in the way");
        fs::write(path.join("keep.txt"), "kept").expect("seed");

        for backup in [true, false] {
            let err = RosterStore::at(&path)
                .with_backup(backup)
                .write(&sample_roster(), None)
                .expect_err("target is a directory");

            assert_eq!(err.kind(), ErrorKind::Io);
            assert!(path.is_dir());
            assert_eq!(fs::read_to_string(path.join("keep.txt")).expect("read"), "kept");
            assert!(!dir.path().join("roster.csv.tmp").exists());
        }
    }

    #[test]
    fn merge_snapshot_requires_a_loaded_baseline() {
        let dir = tempdir().expect("tempdir");
        let snapshot = dir.path().join("snapshot.csv");
        fs::write(&snapshot, "ID,Last Name,First Name\n1,Smith,Jane\n").expect("seed");

        let err = RosterStore::new()
            .merge_snapshot(sample_roster(), &snapshot)
            .expect_err("no baseline");

        assert_eq!(err.kind(), ErrorKind::MissingSource);
    }

    #[test]
    fn merge_snapshot_surfaces_unparseable_snapshot() {
        let dir = tempdir().expect("tempdir");
        let snapshot = dir.path().join("snapshot.csv");
        fs::write(&snapshot, "Last Name,First Name\nSmith,Jane\n").expect("seed");
        let mut existing = sample_roster();
        existing.set_source(dir.path().join("roster.csv"));

        let err = RosterStore::new()
            .merge_snapshot(existing, &snapshot)
            .expect_err("bad snapshot");

        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    }
}
