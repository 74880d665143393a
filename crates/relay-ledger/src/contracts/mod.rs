//! Typed wrappers for the contest contracts

pub mod contest;
pub mod factory;
pub mod messages;

pub use contest::{Contest, ContestInfo, ContestStatus};
pub use factory::ContestFactory;
pub use messages::ContestMessage;
