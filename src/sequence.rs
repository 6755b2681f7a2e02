use image::{DynamicImage, RgbaImage};

use crate::{
    decode::AnimationFrame,
    error::GlazeResult,
    filter::ResolvedFilter,
    fx,
};

/// A processed animation: frames back in RGBA for reassembly, one duration
/// per frame. `frames.len() == durations_ms.len()` holds by construction.
pub struct FrameSequence {
    pub frames: Vec<RgbaImage>,
    pub durations_ms: Vec<u32>,
}

impl FrameSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Apply `filter` to every frame independently, in source order. Each
/// transform result is converted back to RGBA so filters that change color
/// type (invert, b&w, jpegify) reintegrate like any other frame.
pub fn transform_frames(
    filter: &ResolvedFilter,
    frames: Vec<AnimationFrame>,
    dims: (u32, u32),
) -> GlazeResult<FrameSequence> {
    let mut out_frames = Vec::with_capacity(frames.len());
    let mut durations_ms = Vec::with_capacity(frames.len());

    for frame in frames {
        let rendered = fx::apply(filter, DynamicImage::ImageRgba8(frame.image), dims)?;
        out_frames.push(rendered.to_rgba8());
        durations_ms.push(frame.duration_ms);
    }

    Ok(FrameSequence {
        frames: out_frames,
        durations_ms,
    })
}
