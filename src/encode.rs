use std::io::Cursor;

use anyhow::Context as _;
use gif::{DisposalMethod, Encoder, Repeat};
use image::DynamicImage;

use crate::{
    error::{GlazeError, GlazeResult},
    sequence::FrameSequence,
};

/// Output container for a rendered result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Gif,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }
}

/// Encoded response bytes plus the container they hold.
#[derive(Debug)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

/// Losslessly encode a single transformed image.
pub fn encode_png(image: &DynamicImage) -> GlazeResult<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Reassemble a processed frame sequence as an animated GIF: infinite loop,
/// per-frame delay in centiseconds (durations are milliseconds), and
/// Background disposal so each frame fully replaces the previous one.
pub fn encode_gif(seq: &FrameSequence) -> GlazeResult<Vec<u8>> {
    let first = seq
        .frames
        .first()
        .ok_or_else(|| GlazeError::input("animation has no frames"))?;
    let (width, height) = first.dimensions();
    let (width, height) = (
        u16::try_from(width).map_err(|_| gif_too_large())?,
        u16::try_from(height).map_err(|_| gif_too_large())?,
    );

    let mut buf = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buf, width, height, &[]).context("gif encoder init")?;
        encoder
            .set_repeat(Repeat::Infinite)
            .context("gif set repeat")?;

        for (image, &duration_ms) in seq.frames.iter().zip(&seq.durations_ms) {
            let mut rgba = image.as_raw().clone();
            let mut frame = gif::Frame::from_rgba_speed(width, height, &mut rgba, 10);
            frame.delay = (duration_ms / 10).min(u32::from(u16::MAX)) as u16;
            frame.dispose = DisposalMethod::Background;
            encoder.write_frame(&frame).context("gif write frame")?;
        }
    }
    Ok(buf)
}

fn gif_too_large() -> GlazeError {
    GlazeError::input("image dimensions exceed the GIF maximum (65535x65535)")
}

#[cfg(test)]
mod tests {
    use image::{AnimationDecoder, Rgba, RgbaImage, codecs::gif::GifDecoder};

    use super::*;

    #[test]
    fn png_roundtrips() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 4, Rgba([9, 8, 7, 255])));
        let bytes = encode_png(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (5, 4));
    }

    #[test]
    fn gif_preserves_frame_count_and_delays() {
        let seq = FrameSequence {
            frames: (0..3)
                .map(|i| RgbaImage::from_pixel(6, 6, Rgba([i * 60, 0, 0, 255])))
                .collect(),
            durations_ms: vec![50, 60, 70],
        };
        let bytes = encode_gif(&seq).unwrap();

        let decoder = GifDecoder::new(std::io::Cursor::new(bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 3);
        let delays: Vec<u32> = frames
            .iter()
            .map(|f| {
                let (numer, denom) = f.delay().numer_denom_ms();
                numer / denom
            })
            .collect();
        assert_eq!(delays, vec![50, 60, 70]);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let seq = FrameSequence {
            frames: vec![],
            durations_ms: vec![],
        };
        assert!(matches!(
            encode_gif(&seq).unwrap_err(),
            GlazeError::Input(_)
        ));
    }
}
