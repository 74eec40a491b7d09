//! PNG input and output
//!
//! The pipeline operates on 8-bit samples, so 16-bit and indexed PNGs
//! are rejected rather than silently quantized. Alpha channels are
//! stripped on load; equalizing transparency makes no sense.

use std::path::Path;

use histeq_core::ImageData;

/// Decode a PNG file into 8-bit image data.
pub fn load_png<P: AsRef<Path>>(path: P) -> Result<ImageData, String> {
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(path.as_ref()).map_err(|e| format!("Failed to open PNG file: {}", e))?;
    let decoder = png::Decoder::new(BufReader::new(file));
    let mut reader = decoder
        .read_info()
        .map_err(|e| format!("Failed to read PNG info: {}", e))?;

    let info = reader.info();
    let width = info.width;
    let height = info.height;
    let color_type = info.color_type;
    let bit_depth = info.bit_depth;

    if bit_depth != png::BitDepth::Eight {
        return Err(format!(
            "Unsupported PNG bit depth {:?}: only 8-bit images are supported",
            bit_depth
        ));
    }

    let buffer_size = reader
        .output_buffer_size()
        .ok_or_else(|| "Failed to determine PNG buffer size".to_string())?;
    let mut buf = vec![0u8; buffer_size];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|e| format!("Failed to read PNG frame: {}", e))?;

    let bytes = &buf[..frame_info.buffer_size()];

    let (samples, channels) = match color_type {
        png::ColorType::Grayscale => (bytes.to_vec(), 1),
        png::ColorType::Rgb => (bytes.to_vec(), 3),
        png::ColorType::GrayscaleAlpha => (strip_alpha(bytes, 1), 1),
        png::ColorType::Rgba => (strip_alpha(bytes, 3), 3),
        png::ColorType::Indexed => {
            return Err("Indexed PNG not supported".to_string());
        }
    };

    ImageData::new(width, height, channels, samples)
}

/// Drop the trailing alpha sample from each pixel.
fn strip_alpha(bytes: &[u8], channels: usize) -> Vec<u8> {
    let mut samples = Vec::with_capacity(bytes.len() / (channels + 1) * channels);
    for pixel in bytes.chunks_exact(channels + 1) {
        samples.extend_from_slice(&pixel[..channels]);
    }
    samples
}

/// Encode 8-bit image data as a PNG file.
pub fn save_png<P: AsRef<Path>>(path: P, image: &ImageData) -> Result<(), String> {
    use std::fs::File;
    use std::io::BufWriter;

    let color_type = match image.channels {
        1 => png::ColorType::Grayscale,
        3 => png::ColorType::Rgb,
        other => {
            return Err(format!(
                "Cannot encode {}-channel image as PNG: expected 1 or 3",
                other
            ));
        }
    };

    let file =
        File::create(path.as_ref()).map_err(|e| format!("Failed to create PNG file: {}", e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width, image.height);
    encoder.set_color(color_type);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("Failed to write PNG header: {}", e))?;
    writer
        .write_image_data(&image.samples)
        .map_err(|e| format!("Failed to write PNG data: {}", e))?;

    Ok(())
}
