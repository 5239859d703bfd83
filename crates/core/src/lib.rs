#![forbid(unsafe_code)]

pub mod error;
pub mod mastery;
pub mod model;
pub mod scheduler;
pub mod time;

pub use error::Error;
pub use mastery::estimate_mastery;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError, next_review_date};
pub use time::Clock;
