pub use super::brands::Entity as Brands;
pub use super::engine_codes::Entity as EngineCodes;
pub use super::engine_variants::Entity as EngineVariants;
pub use super::vehicle_models::Entity as VehicleModels;
