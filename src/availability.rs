//! Availability calculator — remaining covers per slot for one day.
//!
//! Read-only and idempotent. Only CONFIRMED and PENDING reservations hold
//! seats; everything else is an audit marker. The result never goes
//! negative, even if the store briefly over-holds (it should not — the
//! booking transaction prevents it — but a read must not amplify a defect).

use std::collections::BTreeMap;

use crate::models::reservation::Reservation;
use crate::slots::SlotCatalog;

/// Remaining capacity for every catalog slot, full capacity where no
/// reservations exist. `reservations` is the day's rows; inactive statuses
/// are filtered here as well as in the store query.
pub fn remaining_by_slot(
    catalog: &SlotCatalog,
    reservations: &[Reservation],
) -> BTreeMap<String, u32> {
    let mut out = BTreeMap::new();
    for slot in catalog.slots() {
        let used: u32 = reservations
            .iter()
            .filter(|r| r.status.is_active() && r.time_slot == *slot)
            .map(|r| r.people.max(0) as u32)
            .sum();
        out.insert(slot.clone(), catalog.capacity().saturating_sub(used));
    }
    out
}
