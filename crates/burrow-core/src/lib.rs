pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod identifier;
pub mod path;

pub use codec::{IdentifierCodec, PathMatch, Suffix};
pub use config::{ConfigResolver, EndpointMode, GatewayConfig, Settings};
pub use error::{CoreError, Result};
pub use identifier::Identifier;
