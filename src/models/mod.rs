pub mod profile;
pub mod site_setting;
pub mod user_role;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::profile::{self, Entity as Profile};
    pub use super::site_setting::{self, Entity as SiteSetting};
    pub use super::user_role::{self, Entity as UserRole};
}
