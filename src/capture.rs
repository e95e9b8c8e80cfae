//! One capture invocation: resolve, encode, output
//!
//! Failures are terminal. Whatever goes wrong is turned into exactly one
//! message for the user, and the detail goes to the log.

use std::fmt;

use log::{error, info, warn};

use crate::config::ViewerConfig;
use crate::debugger::navigator::SessionNavigator;
use crate::debugger::protocol::DebugTransport;
use crate::debugger::variables::VariableRef;
use crate::error::{Result, Severity, ViewerError};
use crate::image::tiff;
use crate::output::ImageSink;

/// Summary of a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub variable: String,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Pixel bytes read from the debuggee
    pub data_bytes: usize,
    /// Size of the encoded file
    pub file_bytes: usize,
}

impl fmt::Display for CaptureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}x{} @ {} bpp ({} bytes)",
            self.variable, self.width, self.height, self.bits_per_pixel, self.data_bytes
        )
    }
}

/// Result of an invocation as presented to the user
#[derive(Debug)]
pub enum CaptureOutcome {
    Captured(CaptureReport),
    Failed {
        severity: Severity,
        message: String,
        error: ViewerError,
    },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Captured(_))
    }

    /// The single line shown to the user
    pub fn message(&self) -> String {
        match self {
            CaptureOutcome::Captured(report) => format!("Captured {}", report),
            CaptureOutcome::Failed { message, .. } => message.clone(),
        }
    }
}

/// Resolve `variable`, encode it and hand the file to `sink`
pub async fn capture_image<T, S>(
    transport: &T,
    variable: &VariableRef,
    config: &ViewerConfig,
    sink: &mut S,
) -> Result<CaptureReport>
where
    T: DebugTransport + ?Sized,
    S: ImageSink + ?Sized,
{
    let (descriptor, pixels) = SessionNavigator::new(transport)
        .resolve_image(variable, config)
        .await?;
    info!("Read image data for {}", variable.name);

    let raster = tiff::encode(
        descriptor.width,
        descriptor.height,
        descriptor.bits_per_pixel,
        &pixels,
    )?;

    info!("Showing {} ({} bytes)", variable.name, raster.len());
    sink.write_and_display(&raster)?;

    Ok(CaptureReport {
        variable: variable.name.clone(),
        width: descriptor.width,
        height: descriptor.height,
        bits_per_pixel: descriptor.bits_per_pixel,
        data_bytes: pixels.len(),
        file_bytes: raster.len(),
    })
}

/// Run a capture and fold any failure into a user-facing outcome
pub async fn run_capture<T, S>(
    transport: &T,
    variable: Option<&VariableRef>,
    config: &ViewerConfig,
    sink: &mut S,
) -> CaptureOutcome
where
    T: DebugTransport + ?Sized,
    S: ImageSink + ?Sized,
{
    let result = match variable {
        Some(variable) => capture_image(transport, variable, config, sink).await,
        None => Err(ViewerError::NoVariable),
    };

    match result {
        Ok(report) => CaptureOutcome::Captured(report),
        Err(err) => {
            let severity = err.severity();
            let message = match &err {
                ViewerError::Transport(e) => format!("Evaluate error: {}", e),
                other => other.to_string(),
            };
            match severity {
                Severity::Warning => warn!("Capture failed: {:?}", err),
                Severity::Error => error!("Capture failed: {:?}", err),
            }
            CaptureOutcome::Failed {
                severity,
                message,
                error: err,
            }
        }
    }
}
