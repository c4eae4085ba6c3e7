pub mod components;
pub mod incidents;
pub mod maintenance;
pub mod metrics;
pub mod overview;
pub mod subscriptions;
