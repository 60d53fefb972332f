mod catalog;
mod import;

pub use catalog::{cmd_brands, cmd_models, cmd_search, cmd_variants};
pub use import::{cmd_import, cmd_stats};
