pub mod broker;

pub use broker::{BrokerError, TaskBroker, TaskEnvelope};
