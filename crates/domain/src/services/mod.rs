//! Business logic services.

pub mod lifecycle;
pub mod notification;
pub mod redemption;
pub mod reply;
pub mod store;

pub use lifecycle::{CreateAccessRequest, LifecycleError, RequestLifecycle};
pub use notification::{ChannelError, MockNotifier, Notifier};
pub use redemption::{RedemptionError, RedemptionGate};
pub use reply::{parse_reply, ReplyCommand};
pub use store::{AccessRequestStore, InMemoryStore, StoreError};
