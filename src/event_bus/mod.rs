//! Typed publish/subscribe between the session core and its consumers.
pub mod bus_event;
pub mod event_bus;

pub use bus_event::{BusEvent, EventName, RemoteStreamView};
pub use event_bus::{EventBus, Subscription};
