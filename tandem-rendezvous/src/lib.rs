mod service;
mod ws;

pub use service::RendezvousService;
