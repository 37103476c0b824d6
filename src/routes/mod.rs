mod health_check;
mod subscriptions;

pub use health_check::health_check;
pub use subscriptions::{handle_subscribe, handle_subscribe_method_not_allowed, SubscribeError};
