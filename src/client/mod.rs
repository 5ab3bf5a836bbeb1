//! Client half of the dispatch protocol: the channel connection manager and
//! the rider/driver flows built on top of it.

mod connection;
mod driver;
mod rest;
mod rider;

pub use connection::{ChannelClient, Credentials, ReconnectPolicy, Subscription};
pub use driver::DriverSession;
pub use rest::RestClient;
pub use rider::{RiderSession, Selection};
