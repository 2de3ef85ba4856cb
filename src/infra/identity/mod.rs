pub mod jwt_provider;

pub use jwt_provider::JwtIdentityProvider;
