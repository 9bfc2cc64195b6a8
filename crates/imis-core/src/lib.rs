pub mod error;
pub mod reconcile;
mod record;
mod roster;
pub mod select;

pub use error::{ErrorKind, RosterError};
pub use reconcile::{merge, merge_with_report, MergeReport};
pub use record::{roster_order, MemberId, Record, SelectionDate, STAMP_FORMAT};
pub use roster::{Roster, RosterStats};
pub use select::select_members;
