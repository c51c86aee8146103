pub mod api;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod duplicates;
pub mod error;
pub mod grid;
pub mod pending;
pub mod selection;
pub mod tracker;

pub use api::ApiClient;
pub use config::Config;
pub use console::{ClickAction, Console};
pub use dispatch::{AcceptedCommand, BatchResult, Dispatcher};
pub use duplicates::DuplicateResolver;
pub use error::ConsoleError;
pub use grid::{DragSelector, SeatGrid};
pub use pending::PendingQueue;
pub use selection::SelectionStore;
pub use tracker::{BatchProgress, ResultTracker, TrackerEvent};
