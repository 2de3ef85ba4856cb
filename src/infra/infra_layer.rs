// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "store/mod.rs"]
pub mod store;

#[path = "whatsapp/mod.rs"]
pub mod whatsapp;

#[path = "identity/mod.rs"]
pub mod identity;
