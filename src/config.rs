//! Viewer configuration
//!
//! Settings are read through the [`ConfigSource`] capability so the capture
//! core never touches a particular settings store. [`SettingsSource`] is the
//! JSON-backed implementation used by the command-line front end.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use log::debug;
use serde_json::{Map, Value};

use crate::error::{Result, ViewerError};

/// Settings section the keys live under
pub const SECTION: &str = "image-viewer";

pub const KEY_DATA_PTR_NAME: &str = "imageDataPtrName";
pub const KEY_WIDTH_NAME: &str = "imageWidthName";
pub const KEY_HEIGHT_NAME: &str = "imageHeightName";
pub const KEY_BITS_PER_PIXEL_NAME: &str = "BitsPerPixelName";
pub const KEY_DEFAULT_WIDTH: &str = "defaultWidth";
pub const KEY_DEFAULT_HEIGHT: &str = "defaultHeight";
pub const KEY_DEFAULT_BITS_PER_PIXEL: &str = "defaultBitsPerPixel";
pub const KEY_CLASS_NAME: &str = "imageClassName";
pub const KEY_TEMP_IMG_PATH: &str = "TempImgPath";
pub const KEY_SHOW_IMG_CMD: &str = "ShowImgCmd";

/// Read-only key/value settings store
pub trait ConfigSource {
    /// String value of a key, if set
    fn get_str(&self, key: &str) -> Option<String>;

    /// Non-negative integer value of a key, if set
    fn get_u64(&self, key: &str) -> Option<u64>;
}

/// Settings backed by a JSON object
///
/// Keys are looked up as `image-viewer.<key>`, then inside a nested
/// `image-viewer` object, then bare.
#[derive(Debug, Clone, Default)]
pub struct SettingsSource {
    values: Map<String, Value>,
}

impl SettingsSource {
    /// Create an empty settings store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON text; the top level must be an object
    pub fn from_json(text: &str) -> AnyResult<Self> {
        let value: Value = serde_json::from_str(text).context("settings are not valid JSON")?;
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => anyhow::bail!("settings must be a JSON object, found {}", other),
        }
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let source = Self::from_json(&text)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        debug!("Loaded {} settings from {}", source.values.len(), path.display());
        Ok(source)
    }

    /// Override a single key (stored under the section prefix)
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(format!("{}.{}", SECTION, key), value.into());
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.values
            .get(&format!("{}.{}", SECTION, key))
            .or_else(|| {
                self.values
                    .get(SECTION)
                    .and_then(Value::as_object)
                    .and_then(|section| section.get(key))
            })
            .or_else(|| self.values.get(key))
            .filter(|value| !value.is_null())
    }
}

impl ConfigSource for SettingsSource {
    fn get_str(&self, key: &str) -> Option<String> {
        match self.lookup(key)? {
            Value::String(s) => Some(s.clone()),
            // Objects (e.g. an inline type map) are handed over as JSON text
            other => Some(other.to_string()),
        }
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        let value = self.lookup(key)?;
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        })
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }
}

/// The four image fields read from the inspected variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageField {
    DataPointer,
    Width,
    Height,
    BitsPerPixel,
}

impl fmt::Display for ImageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageField::DataPointer => "data pointer",
            ImageField::Width => "width",
            ImageField::Height => "height",
            ImageField::BitsPerPixel => "bits per pixel",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of the viewer settings for one capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerConfig {
    pub data_ptr_name: String,
    pub width_name: String,
    pub height_name: String,
    pub bits_per_pixel_name: String,
    pub default_width: u64,
    pub default_height: u64,
    pub default_bits_per_pixel: u64,
    /// Raw `imageClassName` JSON, parsed per capture by [`ViewerConfig::type_links`]
    pub image_class_name: String,
    pub temp_img_path: String,
    pub show_img_cmd: String,
}

impl ViewerConfig {
    /// Read every key from a settings source, defaulting to empty/zero
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let text = |key: &str| source.get_str(key).unwrap_or_default();
        let number = |key: &str| source.get_u64(key).unwrap_or(0);

        Self {
            data_ptr_name: text(KEY_DATA_PTR_NAME),
            width_name: text(KEY_WIDTH_NAME),
            height_name: text(KEY_HEIGHT_NAME),
            bits_per_pixel_name: text(KEY_BITS_PER_PIXEL_NAME),
            default_width: number(KEY_DEFAULT_WIDTH),
            default_height: number(KEY_DEFAULT_HEIGHT),
            default_bits_per_pixel: number(KEY_DEFAULT_BITS_PER_PIXEL),
            image_class_name: text(KEY_CLASS_NAME),
            temp_img_path: text(KEY_TEMP_IMG_PATH),
            show_img_cmd: text(KEY_SHOW_IMG_CMD),
        }
    }

    /// Fail with every required key that is empty
    pub fn check(&self) -> Result<()> {
        let missing: Vec<&'static str> = [
            (KEY_DATA_PTR_NAME, &self.data_ptr_name),
            (KEY_TEMP_IMG_PATH, &self.temp_img_path),
            (KEY_SHOW_IMG_CMD, &self.show_img_cmd),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(key, _)| key)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ViewerError::ConfigIncomplete(missing))
        }
    }

    /// Parse the type map from `imageClassName`
    pub fn type_links(&self) -> Result<TypeLinkMap> {
        TypeLinkMap::parse(&self.image_class_name)
    }

    /// Configured member name for a field (empty means "use the default")
    pub fn field_name(&self, field: ImageField) -> &str {
        match field {
            ImageField::DataPointer => &self.data_ptr_name,
            ImageField::Width => &self.width_name,
            ImageField::Height => &self.height_name,
            ImageField::BitsPerPixel => &self.bits_per_pixel_name,
        }
    }

    /// Fallback value for a field whose member name is empty
    pub fn default_value(&self, field: ImageField) -> Option<u64> {
        match field {
            ImageField::DataPointer => None,
            ImageField::Width => Some(self.default_width),
            ImageField::Height => Some(self.default_height),
            ImageField::BitsPerPixel => Some(self.default_bits_per_pixel),
        }
    }
}

/// Runtime type name to member-access operator (`.` or `->`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeLinkMap {
    links: HashMap<String, String>,
}

impl TypeLinkMap {
    /// Parse a JSON object, accepting single quotes in place of double quotes
    pub fn parse(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(ViewerError::InvalidTypeMap(format!("{} is empty", KEY_CLASS_NAME)));
        }
        let normalized = json.replace('\'', "\"");
        let links: HashMap<String, String> = serde_json::from_str(&normalized)
            .map_err(|e| ViewerError::InvalidTypeMap(e.to_string()))?;
        Ok(Self { links })
    }

    /// Member-access operator for a type name
    pub fn link_for(&self, type_name: &str) -> Option<&str> {
        self.links.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
