mod dispatcher;
mod gate;
mod history;
mod twilio;

pub use dispatcher::{AlertDispatcher, DispatchOutcome, Notifier, NOT_CONFIGURED_REASON};
pub use gate::AlertGate;
pub use history::{AlertHistory, AlertRecord, AlertStatus, HISTORY_LIMIT};
pub use twilio::{MessagingCredentials, TwilioNotifier};
pub(crate) use history::resolve_timezone;

#[cfg(test)]
pub(crate) use dispatcher::tests as test_support;
