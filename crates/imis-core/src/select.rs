use crate::error::RosterError;
use crate::record::MemberId;
use crate::roster::Roster;
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Draws `count` distinct eligible members uniformly without replacement and
/// stamps each with `today`. The roster is untouched when there are not
/// enough eligible members. Persisting the result is up to the caller.
pub fn select_members<R>(
    roster: &mut Roster,
    count: usize,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Vec<MemberId>, RosterError>
where
    R: Rng + ?Sized,
{
    let mut eligible: Vec<MemberId> = roster
        .active()
        .filter(|record| record.is_eligible())
        .map(|record| record.id)
        .collect();

    if count > eligible.len() {
        return Err(RosterError::InsufficientCandidates {
            requested: count,
            available: eligible.len(),
        });
    }

    let (chosen, _) = eligible.partial_shuffle(rng, count);
    let chosen = chosen.to_vec();

    for member_id in &chosen {
        if let Some(record) = roster.get_mut(*member_id) {
            record.stamp(today);
        }
    }

    info!(
        requested = count,
        eligible = eligible.len(),
        date = %today.format(crate::record::STAMP_FORMAT),
        "members selected"
    );

    Ok(chosen)
}
