pub mod client;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod soap;
pub mod telemetry;

pub use client::{SubmitMode, TicketSubmission, ViispClient};
pub use config::Config;
pub use crypto::Credential;
pub use error::{ConfigurationError, CryptoError, Error, ProtocolError, Result, TransportError};
pub use models::{Ticket, UserInfo};
