pub mod auth;
pub mod locale;

pub use auth::{auth_middleware, AuthUser};
pub use locale::RequestLocale;
