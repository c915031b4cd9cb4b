pub mod bag;
pub mod clients;
pub mod config;
pub mod deposit;
pub mod inbox;
pub mod observability;
pub mod queue;
pub mod server;
pub mod task;
pub mod worker;
