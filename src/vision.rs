//! Turns an attached image into text context for the persona prompt.
//!
//! Nothing here fails a turn: every problem comes back as a readable string that is placed
//! in the prompt like any other description.

use crate::config::OllamaSettings;
use crate::logging::{log_error, log_generation};
use crate::ollama::{GenerationOptions, OllamaClient};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

const DESCRIBE_PROMPT: &str = "Describe this image in detail. Transcribe any readable text \
exactly. If it contains equations, diagrams or charts, explain their structure and meaning. \
Be concrete about objects, people, colors and layout.";

/// Container format and, when the header can be read, pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub dimensions: Option<(u32, u32)>,
}

impl ImageInfo {
    pub fn format_name(&self) -> String {
        format!("{:?}", self.format).to_uppercase()
    }

    fn header(&self) -> String {
        match self.dimensions {
            Some((w, h)) => format!(
                "{} image, {} x {} pixels in {}.",
                self.format_name(),
                w,
                h,
                orientation(w, h)
            ),
            None => format!("{} image.", self.format_name()),
        }
    }
}

/// Identify the image in `bytes`. Unknown containers are an error; a truncated header
/// only loses the dimensions.
pub fn inspect(bytes: &[u8]) -> Result<ImageInfo, String> {
    let format = image::guess_format(bytes).map_err(|e| format!("unsupported image format ({})", e))?;
    let dimensions = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .ok();
    Ok(ImageInfo { format, dimensions })
}

fn orientation(width: u32, height: u32) -> &'static str {
    if height == 0 {
        return "unknown orientation";
    }
    let ratio = width as f64 / height as f64;
    if ratio > 1.3 {
        "landscape orientation"
    } else if ratio < 0.8 {
        "portrait orientation"
    } else {
        "square format"
    }
}

/// What the vision step hands to the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageContext {
    pub text: String,
    /// The bytes are a recognizable image and may go to the primary model as well.
    pub attach: bool,
}

impl ImageContext {
    fn rejected(text: String) -> Self {
        Self { text, attach: false }
    }
}

pub struct VisionProcessor {
    model: String,
    options: GenerationOptions,
}

impl VisionProcessor {
    pub fn new(settings: &OllamaSettings) -> Self {
        Self {
            model: settings.vision_model.clone(),
            options: GenerationOptions::from_settings(settings),
        }
    }

    /// Describe `bytes` with the vision model. Always returns text.
    pub async fn describe(&self, client: &OllamaClient, bytes: &[u8]) -> ImageContext {
        if bytes.is_empty() {
            return ImageContext::rejected("No image provided.".to_string());
        }
        let info = match inspect(bytes) {
            Ok(info) => info,
            Err(e) => {
                let message = format!("Image processing error: {}", e);
                log_error(None, &message);
                return ImageContext::rejected(message);
            }
        };

        log_generation(
            None,
            &format!("Describing {} ({} bytes) with {}", info.format_name(), bytes.len(), self.model),
        );
        let text = match client
            .generate(&self.model, DESCRIBE_PROMPT, &self.options, &[bytes.to_vec()])
            .await
        {
            Ok(description) => format!(
                "📷 IMAGE VISUAL ANALYSIS:\n{}\n\n{}\n\nRespond as if you are looking directly at this image. Read out any text it contains.",
                info.header(),
                description.trim()
            ),
            Err(e) => {
                let message = format!("Image processing error: {}", e);
                log_error(None, &message);
                message
            }
        };
        ImageContext { text, attach: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::tests::{serve_once, settings_for};
    use image::{DynamicImage, RgbImage};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_inspect_reads_format_and_size() {
        let png = inspect(&encoded(1920, 1080, ImageFormat::Png)).unwrap();
        assert_eq!(png.format, ImageFormat::Png);
        assert_eq!(png.dimensions, Some((1920, 1080)));
        assert_eq!(png.header(), "PNG image, 1920 x 1080 pixels in landscape orientation.");

        let jpeg = inspect(&encoded(480, 640, ImageFormat::Jpeg)).unwrap();
        assert_eq!(jpeg.format, ImageFormat::Jpeg);
        assert_eq!(jpeg.dimensions, Some((480, 640)));
        assert_eq!(orientation(480, 640), "portrait orientation");
    }

    #[test]
    fn test_truncated_header_keeps_format() {
        let tiff = inspect(b"II*\0\x08\0\0\0").unwrap();
        assert_eq!(tiff.format, ImageFormat::Tiff);
        assert_eq!(tiff.dimensions, None);
        assert_eq!(tiff.header(), "TIFF image.");

        assert!(inspect(b"hello world").is_err());
    }

    #[tokio::test]
    async fn test_bad_input_becomes_text_and_is_not_attached() {
        let settings = settings_for("http://127.0.0.1:9");
        let client = OllamaClient::new(&settings);
        let vision = VisionProcessor::new(&settings);

        let empty = vision.describe(&client, &[]).await;
        assert_eq!(empty.text, "No image provided.");
        assert!(!empty.attach);

        let garbage = vision.describe(&client, b"plain text").await;
        assert!(garbage.text.starts_with("Image processing error"));
        assert!(!garbage.attach);
    }

    #[tokio::test]
    async fn test_runtime_failure_becomes_text() {
        let url = serve_once("500 Internal Server Error", "boom".to_string()).await;
        let settings = settings_for(&url);
        let client = OllamaClient::new(&settings);
        let vision = VisionProcessor::new(&settings);

        let context = vision.describe(&client, &encoded(10, 10, ImageFormat::Png)).await;
        assert!(context.text.starts_with("Image processing error"));
        assert!(context.attach);
    }

    #[tokio::test]
    async fn test_description_is_wrapped_with_header() {
        let url = serve_once("200 OK", r#"{"response":"A whiteboard with E=mc^2","done":true}"#.to_string()).await;
        let settings = settings_for(&url);
        let client = OllamaClient::new(&settings);
        let vision = VisionProcessor::new(&settings);

        let context = vision.describe(&client, &encoded(800, 800, ImageFormat::Png)).await;
        assert!(context.text.contains("PNG image, 800 x 800 pixels in square format."));
        assert!(context.text.contains("A whiteboard with E=mc^2"));
    }
}
