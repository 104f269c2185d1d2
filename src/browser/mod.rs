pub mod connection;

pub use connection::{connect, debug_port_open};
