pub mod dto;
pub mod model;
pub mod repository;

pub use dto::NewAccount;
pub use model::{Account, Profile, DEFAULT_ROLE};
pub use repository::AccountRepositoryInterface;
