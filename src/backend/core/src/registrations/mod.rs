//! Attendee registrations and the capacity-bounded ledger.

mod ledger;
mod model;

pub use ledger::{RegistrationLedger, RetryPolicy};
pub use model::{registration_id, Registration, RegistrationStatus, COLLECTION};
