use std::io::Cursor;

use image::{AnimationDecoder, DynamicImage, RgbaImage, codecs::gif::GifDecoder};

use crate::error::{GlazeError, GlazeResult};

/// One extracted frame of an animated input, already normalized to RGBA.
#[derive(Debug)]
pub struct AnimationFrame {
    pub image: RgbaImage,
    /// Source frame duration in milliseconds, defaulting to 1 when the
    /// frame carries no delay.
    pub duration_ms: u32,
}

#[derive(Debug)]
pub enum DecodedInput {
    Static(DynamicImage),
    Animated(Vec<AnimationFrame>),
}

impl DecodedInput {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DecodedInput::Static(img) => (img.width(), img.height()),
            DecodedInput::Animated(frames) => frames
                .first()
                .map(|f| f.image.dimensions())
                .unwrap_or((0, 0)),
        }
    }
}

/// Decode raw bytes into either a static image or an animated frame list.
///
/// Animation probing is lenient: only a GIF that actually yields more than
/// one frame takes the animated path, and any error while iterating frames
/// falls back to static decoding rather than failing the request.
pub fn decode_input(bytes: &[u8]) -> GlazeResult<DecodedInput> {
    if looks_like_gif(bytes)
        && let Some(frames) = probe_animation(bytes)
        && frames.len() > 1
    {
        return Ok(DecodedInput::Animated(frames));
    }
    decode_static(bytes).map(DecodedInput::Static)
}

pub fn decode_static(bytes: &[u8]) -> GlazeResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| GlazeError::input(format!("invalid image: {e}")))
}

fn looks_like_gif(bytes: &[u8]) -> bool {
    bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")
}

fn probe_animation(bytes: &[u8]) -> Option<Vec<AnimationFrame>> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).ok()?;
    let frames = decoder.into_frames().collect_frames().ok()?;
    let frames = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let duration_ms = if denom == 0 { 0 } else { numer / denom };
            AnimationFrame {
                image: frame.into_buffer(),
                duration_ms: duration_ms.max(1),
            }
        })
        .collect();
    Some(frames)
}
