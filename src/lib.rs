//! PIXCAT - pull raw image buffers out of a paused debug session
//!
//! A selected variable is resolved through Debug Adapter Protocol requests
//! into a data pointer, width, height and bit depth; the pixel memory is read
//! and wrapped in a minimal TIFF file that any image viewer can open.

pub mod capture;
pub mod config;
pub mod debugger;
pub mod error;
pub mod image;
pub mod output;

use std::io::Write;

/// Re-export key types for easier access in tests
pub use capture::{capture_image, run_capture, CaptureOutcome, CaptureReport};
pub use config::{ConfigSource, SettingsSource, TypeLinkMap, ViewerConfig};
pub use debugger::client::DapClient;
pub use debugger::navigator::{build_field_expression, resolve_image, ImageDescriptor, SessionNavigator};
pub use debugger::protocol::DebugTransport;
pub use debugger::variables::VariableRef;
pub use error::{Severity, TransportError, ViewerError};
pub use image::tiff::encode;
pub use output::{FileSink, ImageSink, MemorySink};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the logging system
///
/// Every line carries an RFC 3339 timestamp. `RUST_LOG` still overrides the
/// given level. Call once at startup.
pub fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("pixcat", level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                record.args()
            )
        })
        .init();
}
