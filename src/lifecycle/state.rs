//! Scan status state machine.
//!
//! All status changes funnel through [`transition`], which is the single
//! place the "no way out of a terminal state" invariant lives. The database
//! layer additionally guards its UPDATEs on the current status so concurrent
//! writers cannot bypass the machine.

use crate::errors::AstraError;
use crate::models::ScanStatus;

/// Events that drive a scan between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    Start,
    Complete,
    Fail,
    Cancel,
}

/// queued -> running -> {completed, failed, cancelled};
/// queued may also fail or cancel directly.
pub fn transition(current: ScanStatus, event: ScanEvent) -> Result<ScanStatus, AstraError> {
    use ScanEvent::*;
    use ScanStatus::*;

    let next = match (current, event) {
        (Queued, Start) => Running,
        (Queued, Fail) | (Running, Fail) => Failed,
        (Queued, Cancel) | (Running, Cancel) => Cancelled,
        (Running, Complete) => Completed,
        (current, event) => {
            return Err(AstraError::InvalidState(format!(
                "cannot apply {:?} to a {} scan",
                event, current
            )));
        }
    };
    Ok(next)
}
