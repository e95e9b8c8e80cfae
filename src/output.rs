//! Where a captured raster goes
//!
//! [`FileSink`] saves the file and hands it to an external viewer command,
//! [`MemorySink`] keeps it in process for a preview.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use log::{debug, info};
use regex::{Captures, Regex};

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::image::RasterFile;

/// Receives a finished raster and makes it visible
pub trait ImageSink {
    fn write_and_display(&mut self, raster: &RasterFile) -> Result<()>;
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Replace `{key}` placeholders; unknown keys are left as they are
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Writes the raster to disk and launches a viewer on it
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    show_command: String,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, show_command: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            show_command: show_command.into(),
        }
    }

    /// Build a sink from `TempImgPath` and `ShowImgCmd`
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(&config.temp_img_path, &config.show_img_cmd)
    }

    /// The shell command that opens the saved file
    ///
    /// `{path}` is replaced by the file path; a template without it gets the
    /// quoted path appended.
    pub fn command_line(&self) -> String {
        let path = self.path.display().to_string();
        if self.show_command.contains("{path}") {
            let values = HashMap::from([("path", path)]);
            render_template(&self.show_command, &values)
        } else {
            format!("{} \"{}\"", self.show_command.trim_end(), path)
        }
    }

    /// Save the raster, overwriting any previous capture
    pub fn write(&self, raster: &RasterFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raster.as_bytes())?;
        info!("Saved {} bytes to {}", raster.len(), self.path.display());
        Ok(())
    }

    /// Start the viewer without waiting for it
    pub fn launch_viewer(&self) -> Result<u32> {
        let line = self.command_line();
        debug!("Launching viewer: {}", line);

        #[cfg(windows)]
        let mut command = {
            let mut command = Command::new("cmd");
            command.args(["/C", &line]);
            command
        };
        #[cfg(not(windows))]
        let mut command = {
            let mut command = Command::new("sh");
            command.args(["-c", &line]);
            command
        };

        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        info!("Viewer started (pid {})", child.id());
        Ok(child.id())
    }
}

impl ImageSink for FileSink {
    fn write_and_display(&mut self, raster: &RasterFile) -> Result<()> {
        self.write(raster)?;
        self.launch_viewer()?;
        Ok(())
    }
}

/// Keeps the most recent raster in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    last: Option<RasterFile>,
    count: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently displayed raster
    pub fn last(&self) -> Option<&RasterFile> {
        self.last.as_ref()
    }

    /// Number of rasters received
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn take(&mut self) -> Option<RasterFile> {
        self.last.take()
    }
}

impl ImageSink for MemorySink {
    fn write_and_display(&mut self, raster: &RasterFile) -> Result<()> {
        self.last = Some(raster.clone());
        self.count += 1;
        Ok(())
    }
}
