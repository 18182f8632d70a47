//! Facial-emotion journaling: capture a frame, classify it with whichever
//! emotion backend is available, append the result to a CSV log, and report
//! daily aggregates.

pub mod analyzer;
pub mod capture;
pub mod chart;
pub mod config;
pub mod frame;
pub mod journal;
pub mod overlay;

pub use analyzer::{
    select_backend, AnalyzerError, Backend, BackendAvailability, BackendError, BackendKind,
    Capability, Detection, EmotionAnalyzer, EmotionBackend, EmotionResult,
};
pub use capture::{CameraCapture, CaptureError};
pub use chart::save_distribution_chart;
pub use config::Config;
pub use frame::Frame;
pub use journal::{
    append_log_entry, ensure_log_file, get_daily_summary, get_recent_entries, load_log_records,
    DailySummary, LogRecord,
};
pub use overlay::save_annotated_frame;
