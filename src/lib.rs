pub mod app;
pub mod catalog;
pub mod config;
pub mod describe;
pub mod engagement;
pub mod error;
pub mod gate;
pub mod intake;
pub mod models;
pub mod moderation;
pub mod polling;
pub mod query;
pub mod repo;
pub mod seed;
pub mod sync;

// Re-export commonly used items for tests / external users
pub use app::{DashboardSnapshot, Marketplace};
pub use config::Config;
pub use error::{MarketError, MarketResult};
pub use query::{BrowseState, Page, SortCriterion};
