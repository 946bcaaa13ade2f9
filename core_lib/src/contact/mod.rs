//! Contact/quote-request submission: validation, anti-abuse, delivery

pub mod challenge;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod form;
pub mod models;
pub mod phone;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use challenge::{ChallengeError, ChallengeWidget, ReadySignal, TokenRelayWidget, WidgetHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{DeliveryResponse, DeliveryTarget, DeliveryTransport, HttpDelivery, TransportError};
pub use error::{SubmissionError, SUCCESS_MESSAGE};
pub use form::{ChallengeState, ContactForm, FormSnapshot};
pub use models::{ContactFields, OutboundMessage, SubmissionPayload, SubmissionReceipt};
pub use phone::normalize_phone;
pub use service::{ContactSubmissionService, SubmissionSettings, SubmissionState};
