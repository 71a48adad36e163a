mod helpers;
mod identity;
mod middleware;
mod token;

pub use helpers::extract_bearer_token;
pub use identity::{AuthSession, IdentityProvider, IssuedSession, LocalIdentityProvider};
pub use middleware::RequireIdentity;
pub use token::{TokenGenerator, parse_token};
