pub mod contract;
pub mod error;
pub mod event_channel;
pub mod gate;
pub mod registry;

pub use contract::{ENDPOINT_KIND_HEADER, EndpointKind, Payload, Request, Response, WireResponse};
pub use error::{GateError, GateResult};
pub use event_channel::EventChannel;
pub use gate::Gate;
pub use registry::{Endpoint, EndpointRegistry, HandlerFn};
