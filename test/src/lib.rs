pub mod helpers;
pub mod link_conditioner;

pub use helpers::*;
pub use link_conditioner::{ConditionedReceiver, LinkConditionerConfig};
