pub mod clock;
pub mod config;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StorageBackend};
pub use logging::init_logging;
