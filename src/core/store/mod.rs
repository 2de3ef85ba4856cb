// Store port - generic entity store contract plus the typed facade services use.

mod entities;
mod entity_store;

pub use entities::{Entities, Entity};
pub use entity_store::*;
