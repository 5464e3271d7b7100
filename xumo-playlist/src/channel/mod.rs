pub mod content;
pub mod discovery;
pub mod metadata;
pub mod process;
pub mod types;

pub use types::{Channel, ChannelEntry, Issue, OutputBundle, Programme, ResolvedStream};
