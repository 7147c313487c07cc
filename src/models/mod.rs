pub mod auth;
pub mod help_flags;
pub mod response;
pub mod role;
pub mod user;

pub use auth::*;
pub use help_flags::*;
pub use response::*;
pub use role::*;
pub use user::*;
