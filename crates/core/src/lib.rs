pub mod config;
pub mod converter;
pub mod format;
pub mod orchestrator;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, RetentionConfig, SanitizedConfig, ServerConfig, StorageConfig,
};
pub use converter::{
    ConversionJob, ConversionResult, Converter, ConverterConfig, ConverterError, FfmpegConverter,
};
pub use format::{ActivationBytes, InputKind, OutputFormat, ValidationError};
pub use orchestrator::{
    CancellationRegistry, ConversionOrchestrator, ConversionOutcome, ConversionState,
    OrchestratorError, UploadRequest, UploadedFile, ValidatedUpload,
};
pub use storage::{DownloadId, RetentionSweeper, StorageError, TempStore};
