pub mod composite_models;
pub mod models;
pub mod providers;
pub mod system_settings;

pub use composite_models::Entity as CompositeModels;
pub use models::Entity as Models;
pub use providers::Entity as Providers;
pub use system_settings::Entity as SystemSettings;
