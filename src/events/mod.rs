//! Publish/subscribe plumbing shared by every view coordinator.

mod bus;
mod channel;

pub use bus::{DispatchReport, EventBus, SubscriptionId, Subscriptions};
pub use channel::{Channel, Event};
