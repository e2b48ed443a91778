use image::{DynamicImage, ImageFormat};
use resvg::{tiny_skia, usvg};
use thiserror::Error;

pub const WEBP_QUALITY: f32 = 80.0;
/// libwebp `method`: 0 is fastest, 6 compresses hardest.
pub const WEBP_EFFORT: i32 = 6;

/// Largest canvas an SVG may ask for: 512 MiB of RGBA, the same budget
/// `image` applies to raster decodes.
pub const MAX_SVG_PIXELS: u64 = 512 * 1024 * 1024 / 4;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("could not render svg: {0}")]
    Svg(String),

    #[error("could not encode webp: {0}")]
    Encode(String),

    #[error("conversion task was cancelled")]
    Cancelled,
}

/// Re-encodes an uploaded image to lossy WebP. Blocking; call it off the reactor.
pub fn to_webp(bytes: &[u8], mime_type: &str) -> Result<Vec<u8>, ConvertError> {
    let image = match mime_type {
        "image/svg+xml" => rasterize_svg(bytes)?,
        "image/png" => image::load_from_memory_with_format(bytes, ImageFormat::Png)?,
        "image/jpeg" => image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?,
        _ => image::load_from_memory(bytes)?,
    };
    encode_webp(&image)
}

fn rasterize_svg(bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
    let tree = usvg::Tree::from_data(bytes, &svg_options())
        .map_err(|e| ConvertError::Svg(e.to_string()))?;
    let size = tree.size().to_int_size();
    let pixels = u64::from(size.width()) * u64::from(size.height());
    if pixels > MAX_SVG_PIXELS {
        return Err(ConvertError::Svg(format!(
            "canvas {}x{} exceeds {} pixels",
            size.width(),
            size.height(),
            MAX_SVG_PIXELS
        )));
    }
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| ConvertError::Svg("svg has no drawable area".to_string()))?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    // tiny-skia keeps premultiplied alpha; round-trip through PNG to get straight RGBA.
    let png = pixmap
        .encode_png()
        .map_err(|e| ConvertError::Svg(e.to_string()))?;
    Ok(image::load_from_memory_with_format(&png, ImageFormat::Png)?)
}

/// Parser options for untrusted SVG. Only inline `data:` images are embedded;
/// file paths and other hrefs resolve to nothing.
fn svg_options() -> usvg::Options<'static> {
    let mut options = usvg::Options::default();
    options.image_href_resolver.resolve_string = Box::new(|_: &str, _: &usvg::Options| None);
    options
}

fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, ConvertError> {
    let rgba = image.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());

    let mut config = webp::WebPConfig::new()
        .map_err(|_| ConvertError::Encode("libwebp rejected default config".to_string()))?;
    config.quality = WEBP_QUALITY;
    config.method = WEBP_EFFORT;

    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| ConvertError::Encode(format!("{:?}", e)))?;
    Ok(encoded.to_vec())
}
