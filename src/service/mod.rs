pub mod audit;
pub mod error;
pub mod leave;
pub mod notifier;
pub mod store;
