mod publish;
mod subscribe;
mod unsubscribe;

pub use publish::{PublishArguments, publish};
pub use subscribe::{SubscribeArguments, subscribe};
pub use unsubscribe::{UnsubscribeArguments, unsubscribe};
