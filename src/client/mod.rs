//! Tab side: the client adapter, its event registry, and connectors.
//!
//! A tab creates one [`ClientAdapter`], registers callbacks, and calls
//! [`ClientAdapter::start`] with a [`Connector`] once at boot.

pub mod adapter;
pub mod connector;
pub mod registry;

pub use adapter::{ClientAdapter, Phase};
pub use connector::{Channel, Connector, DEFAULT_QUEUE_CAPACITY, LocalConnector, WsConnector};
pub use registry::{Callback, EventRegistry};
