// Dashboard handlers, one file per resource.

pub mod disputes;
pub mod metrics;
pub mod offers;
pub mod profiles;
pub mod reviews;
pub mod sales;
