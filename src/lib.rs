pub mod connection;
pub mod core;
pub mod credentials;
pub mod display;
pub mod fleet;

pub use crate::connection::{codec::PulseCodec, Connection, ConnectionState};
pub use crate::core::{config::AppConfig, errors::ClientError, types::*};
pub use crate::fleet::Fleet;
