pub mod evolution_client;

pub use evolution_client::{DisabledGateway, EvolutionClient};
