pub mod cancellation;
pub mod conflict;
pub mod orchestrator;
pub mod pricing;

pub use cancellation::{CancellationOutcome, RefundTarget};
pub use orchestrator::{BookingOutcome, BookingRequest, BookingService, CommittedBooking, PaymentInitiation};
