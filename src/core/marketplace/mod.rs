// Marketplace domain - the entities every other core module talks about.

mod marketplace_models;
mod money;

pub use marketplace_models::*;
