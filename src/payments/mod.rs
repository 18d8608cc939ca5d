pub mod provider;
pub mod reconciliation;
pub mod stripe;

pub use provider::{Charge, ChargeRequest, PaymentProvider, ProviderError, Refund};
pub use reconciliation::{ProviderEvent, ReconciliationListener, ReconciliationOutcome};
pub use stripe::StripeClient;
