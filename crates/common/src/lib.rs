pub mod config_loader;
pub mod errors;
pub mod structured_logging;

pub use config_loader::{ConfigFormat, ConfigLoader};
pub use errors::{ConfigError, ConfigResult};
pub use structured_logging::{
    init_structured_logging, JsonFormatter, LoggingConfig, OperationTimer, PerformanceMetrics,
    StructuredLogEntry,
};
