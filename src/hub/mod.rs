//! Fan-out of state events to display and admin subscriber connections.

mod events;
mod registry;

pub use events::WireEvent;
pub use registry::{FanoutHub, SubscriberId, SubscriberRole};
