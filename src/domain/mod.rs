// Academy rules that don't touch the database

pub mod attendance;
pub mod balance;
pub mod error;
pub mod listing;
pub mod sessions;

pub use attendance::*;
pub use balance::*;
pub use error::DomainError;
pub use listing::*;
pub use sessions::*;
