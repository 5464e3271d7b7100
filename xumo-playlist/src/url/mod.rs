pub mod endpoint;
pub mod stream;

pub use endpoint::EndpointVars;
pub use stream::{StreamTokens, TokenTable, build_stream_url};
