pub mod affiliation;
pub mod organization;
pub mod permission;
pub mod user;

pub use affiliation::Affiliation;
pub use organization::Organization;
pub use permission::Permission;
pub use user::{User, UserView};
