mod ice_transport;
mod transport_config;
mod transport_event;

pub use ice_transport::IceTransport;
pub use transport_config::TransportConfig;
pub use transport_event::TransportEvent;
