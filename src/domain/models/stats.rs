use serde::Serialize;
use crate::domain::models::attendee::{Attendee, AttendeeStatus};

/// Point-in-time attendance counts for one event. Always derived from the
/// current attendee rows, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub present: u64,
    pub absent: u64,
    pub companions: u64,
}

impl AttendanceStats {
    pub fn tally(attendees: &[Attendee]) -> Self {
        attendees.iter().fold(Self::default(), |mut stats, attendee| {
            stats.total += 1;
            match attendee.status {
                AttendeeStatus::Pending => stats.pending += 1,
                AttendeeStatus::Confirmed => stats.confirmed += 1,
                AttendeeStatus::Present => stats.present += 1,
                AttendeeStatus::Absent => stats.absent += 1,
            }
            // companions count regardless of status; negative values never reach the store
            stats.companions += u64::try_from(attendee.companions_count).unwrap_or(0);
            stats
        })
    }
}
