mod account;
pub mod dto;
pub mod extract;
mod repos;
pub mod response;
mod router;
pub mod validation;

pub use account::account_router;
pub use repos::repos_router;
pub use router::{AppState, create_router};
