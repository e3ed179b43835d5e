// Task Feeder - releases tasks to the Scheduler Engine at their arrival tick

mod error;
mod feeder;
mod loader;
mod service;

pub use error::{FeederError, FeederResult};
pub use feeder::{FeedBatch, TaskFeeder};
pub use loader::{load_tasks, parse_tasks};
pub use service::{FeederService, FeederSummary};
