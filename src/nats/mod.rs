//! NATS messaging for event intake

mod client;
mod intake;

pub use client::NatsClient;
pub use intake::{dispatch, run_intake, Route};
