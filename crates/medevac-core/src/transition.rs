// ── Allowed-transition table ──
//
// Kept as plain data so it can be printed, audited and tested apart from
// the engine. A pair missing from the table is a rejected transition.

use crate::model::EmergencyStatus;

use EmergencyStatus::{
    Accepted, Active, Arriving, Cancelled, Completed, InProgress, OnSite, Pending,
};

/// Outgoing edges for every status. Terminal statuses have none.
static TRANSITIONS: &[(EmergencyStatus, &[EmergencyStatus])] = &[
    (Pending, &[Accepted, Active, Cancelled]),
    (Accepted, &[InProgress, Cancelled]),
    (Active, &[InProgress, Cancelled]),
    (InProgress, &[Arriving, OnSite, Cancelled]),
    (Arriving, &[OnSite, Cancelled]),
    (OnSite, &[Completed, Cancelled]),
    (Completed, &[]),
    (Cancelled, &[]),
];

/// Legal successors of `from`.
pub fn allowed_from(from: EmergencyStatus) -> &'static [EmergencyStatus] {
    TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}

/// Whether the table has an edge `from -> to`.
///
/// Informational: `from == to` is never a table hit, even though
/// [`attempt_transition`](crate::EmergencyStateEngine::attempt_transition)
/// treats it as an idempotent success.
pub fn is_transition_allowed(from: EmergencyStatus, to: EmergencyStatus) -> bool {
    from != to && allowed_from(from).contains(&to)
}

/// The whole table, row by row.
pub fn table() -> impl Iterator<Item = (EmergencyStatus, &'static [EmergencyStatus])> {
    TRANSITIONS.iter().copied()
}
