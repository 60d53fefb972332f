pub mod prelude;

pub mod brands;
pub mod engine_codes;
pub mod engine_variants;
pub mod vehicle_models;
