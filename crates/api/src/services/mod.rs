//! Outbound service integrations.

pub mod email;
pub mod notifier;
pub mod sms;

pub use email::{EmailError, EmailService};
pub use notifier::CompositeNotifier;
pub use sms::{SmsError, SmsService};
