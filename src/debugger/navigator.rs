//! Resolution of a selected variable into image parameters and pixels
//!
//! Every step is a protocol round-trip that depends on the one before it:
//! threads, a one-frame stack check per thread, the active thread's stack, the
//! variable's type, each image field, and finally the pixel memory. Nothing
//! is cached between resolutions because the stopped thread can change.

use log::{debug, info};

use crate::config::{ImageField, ViewerConfig};
use crate::debugger::memory::{decode_payload, MemoryReference, MAX_IMAGE_BYTES};
use crate::debugger::protocol::{value_type, DebugTransport, EvaluateArgumentsContext, EvaluateResponse};
use crate::debugger::variables::{parse_numeric, VariableRef};
use crate::error::{Result, ViewerError};
use crate::image::{check_bit_depth, expected_len};

/// Thread and innermost frame expressions are evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub thread_id: i64,
    pub frame_id: i64,
}

/// Shape of the image found behind a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub data_pointer_expression: String,
}

impl ImageDescriptor {
    /// Number of pixel bytes, `None` if it does not fit in a `u64`
    pub fn byte_len(&self) -> Option<u64> {
        expected_len(self.width, self.height, self.bits_per_pixel)
    }
}

/// Build the expression reaching `field` through `variable`
///
/// A field name with a single leading `&` asks for the address of the
/// member: `("img", ".", "&data")` gives `&(img.data)`. Anything else is
/// plain member access.
pub fn build_field_expression(variable: &str, link: &str, field: &str) -> String {
    let parts: Vec<&str> = field.split('&').collect();
    if parts.len() == 2 && parts[0].is_empty() {
        format!("&({}{}{})", variable, link, parts[1])
    } else {
        format!("{}{}{}", variable, link, field)
    }
}

/// Walks a paused session to pull an image out of a variable
pub struct SessionNavigator<'a, T: DebugTransport + ?Sized> {
    transport: &'a T,
    max_image_bytes: u64,
}

impl<'a, T: DebugTransport + ?Sized> SessionNavigator<'a, T> {
    /// Create a navigator over a transport
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Change the largest pixel buffer that will be read
    pub fn with_max_image_bytes(mut self, max: u64) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Find the first thread with a stack frame and its innermost frame
    pub async fn evaluation_context(&self) -> Result<EvaluationContext> {
        let threads = self.transport.threads().await?;
        if threads.is_empty() {
            return Err(ViewerError::NoThreads);
        }
        debug!("Session has {} threads", threads.len());

        // The stopped thread is not necessarily listed first
        let mut active = None;
        for thread in &threads {
            let frames = self.transport.stack_trace(thread.id, 0, Some(1)).await?;
            if !frames.is_empty() {
                active = Some(thread.id);
                break;
            }
        }
        let thread_id = active.ok_or(ViewerError::NoActiveThread)?;

        let frames = self.transport.stack_trace(thread_id, 0, None).await?;
        let frame = frames.first().ok_or(ViewerError::NoActiveThread)?;

        debug!(
            "Active thread {} at frame {} ({})",
            thread_id, frame.id, frame.name
        );
        Ok(EvaluationContext {
            thread_id,
            frame_id: frame.id,
        })
    }

    /// Resolve a variable into its image descriptor and pixel bytes
    pub async fn resolve_image(
        &self,
        variable: &VariableRef,
        config: &ViewerConfig,
    ) -> Result<(ImageDescriptor, Vec<u8>)> {
        config.check()?;
        if variable.evaluate_name.is_empty() {
            return Err(ViewerError::NoVariable);
        }
        let type_links = config.type_links()?;

        let context = self.evaluation_context().await?;

        let var = variable.evaluate_name.as_str();
        let watched = self.evaluate(var, &context).await?;
        let type_name = value_type(&watched);
        let link = type_links
            .link_for(type_name)
            .ok_or_else(|| ViewerError::UnknownType(type_name.to_string()))?;
        debug!("Variable {} has type '{}', member access '{}'", var, type_name, link);

        let pointer_expression = build_field_expression(var, link, &config.data_ptr_name);
        let pointer = self.data_pointer(&pointer_expression, &context).await?;
        info!("Image data pointer {} is {}", pointer_expression, pointer);

        let width = self.field_value(ImageField::Width, var, link, config, &context).await?;
        let height = self.field_value(ImageField::Height, var, link, config, &context).await?;
        let bits = self
            .field_value(ImageField::BitsPerPixel, var, link, config, &context)
            .await?;

        let bits_per_pixel = check_bit_depth(bits)?;
        let width = fit_u32(ImageField::Width, config, width)?;
        let height = fit_u32(ImageField::Height, config, height)?;

        let descriptor = ImageDescriptor {
            width,
            height,
            bits_per_pixel,
            data_pointer_expression: pointer_expression,
        };
        info!(
            "Image is {}x{} at {} bits per pixel",
            descriptor.width, descriptor.height, descriptor.bits_per_pixel
        );

        let count = descriptor
            .byte_len()
            .filter(|count| *count <= self.max_image_bytes)
            .ok_or(ViewerError::ImageTooLarge {
                width,
                height,
                bits_per_pixel,
                max: self.max_image_bytes,
            })?;
        let pixels = self.read_pixels(&pointer, count).await?;
        Ok((descriptor, pixels))
    }

    async fn evaluate(&self, expression: &str, context: &EvaluationContext) -> Result<EvaluateResponse> {
        let response = self
            .transport
            .evaluate(expression, context.frame_id, EvaluateArgumentsContext::Watch)
            .await?;
        Ok(response)
    }

    async fn data_pointer(&self, expression: &str, context: &EvaluationContext) -> Result<MemoryReference> {
        let response = self.evaluate(expression, context).await?;
        let token = response
            .memory_reference
            .as_deref()
            .ok_or_else(|| ViewerError::NoMemoryReference(response.result.clone()))?;
        MemoryReference::parse(token)
    }

    async fn field_value(
        &self,
        field: ImageField,
        var: &str,
        link: &str,
        config: &ViewerConfig,
        context: &EvaluationContext,
    ) -> Result<u64> {
        let name = config.field_name(field);
        if name.is_empty() {
            let value = config.default_value(field).unwrap_or(0);
            debug!("No member configured for {}, using default {}", field, value);
            return Ok(value);
        }

        let expression = build_field_expression(var, link, name);
        let response = self.evaluate(&expression, context).await?;
        let value = parse_numeric(&response.result).ok_or_else(|| ViewerError::FieldNotNumeric {
            field: name.to_string(),
            raw: response.result.clone(),
        })?;
        debug!("{} = {} ({})", expression, value, field);
        Ok(value)
    }

    async fn read_pixels(&self, pointer: &MemoryReference, count: u64) -> Result<Vec<u8>> {
        let response = self
            .transport
            .read_memory(pointer.token(), 0, count)
            .await
            .map_err(|e| ViewerError::MemoryReadFailed(e.to_string()))?;
        decode_payload(&response, count)
    }
}

fn fit_u32(field: ImageField, config: &ViewerConfig, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        let name = config.field_name(field);
        ViewerError::FieldOutOfRange {
            field: if name.is_empty() { field.to_string() } else { name.to_string() },
            value,
        }
    })
}

/// Resolve a variable through a transport
pub async fn resolve_image<T: DebugTransport + ?Sized>(
    transport: &T,
    variable: &VariableRef,
    config: &ViewerConfig,
) -> Result<(ImageDescriptor, Vec<u8>)> {
    SessionNavigator::new(transport).resolve_image(variable, config).await
}
