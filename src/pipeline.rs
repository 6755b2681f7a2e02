use crate::{
    decode::{DecodedInput, decode_input},
    encode::{OutputFormat, Rendered, encode_gif, encode_png},
    error::{GlazeError, GlazeResult},
    filter::ResolvedFilter,
    fx,
    sequence::transform_frames,
};

/// Run the full render pipeline on already-fetched source bytes:
/// decode, branch on static vs animated, transform, encode.
///
/// The filter is resolved by the caller (the HTTP layer resolves before it
/// fetches, so an unknown name never costs a network round trip).
#[tracing::instrument(skip_all, fields(len = bytes.len(), filter = ?filter))]
pub fn render(bytes: &[u8], filter: &ResolvedFilter) -> GlazeResult<Rendered> {
    let decoded = decode_input(bytes)?;
    let dims = decoded.dimensions();

    match decoded {
        DecodedInput::Static(image) => {
            tracing::debug!(width = dims.0, height = dims.1, "rendering static image");
            let out = fx::apply(filter, image, dims)?;
            Ok(Rendered {
                bytes: encode_png(&out)?,
                format: OutputFormat::Png,
            })
        }
        DecodedInput::Animated(frames) => {
            if let Some(limit) = filter.frame_limit()
                && frames.len() > limit
            {
                return Err(GlazeError::policy(format!(
                    "too many frames to render this filter ({} > {limit})",
                    frames.len()
                )));
            }
            tracing::debug!(
                width = dims.0,
                height = dims.1,
                frames = frames.len(),
                "rendering animation"
            );
            let seq = transform_frames(filter, frames, dims)?;
            Ok(Rendered {
                bytes: encode_gif(&seq)?,
                format: OutputFormat::Gif,
            })
        }
    }
}
