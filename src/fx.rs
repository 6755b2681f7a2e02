use anyhow::Context as _;
use color_quant::NeuQuant;
use image::{
    DynamicImage, GrayImage, RgbaImage,
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
};

use crate::{
    error::GlazeResult,
    filter::ResolvedFilter,
};

/// Pixelate superpixel edge length, in source pixels per axis.
const SUPERPIXEL_SIZE: u32 = 10;

/// 3x3 smoothing kernel the sharpen step blends against (center 5, ring 1,
/// normalized by 13).
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

/// Apply a resolved filter to one fully-decoded frame.
///
/// `dims` is the ORIGINAL canvas size, recorded once before any frame loop:
/// size-dependent filters (pixelate, deepfry, wide, overlay) scale every
/// frame of an animation by the same factors.
pub fn apply(
    filter: &ResolvedFilter,
    image: DynamicImage,
    dims: (u32, u32),
) -> GlazeResult<DynamicImage> {
    match filter {
        ResolvedFilter::Blur => Ok(image.blur(2.5)),
        ResolvedFilter::Invert => Ok(invert(image)),
        ResolvedFilter::Flip => Ok(image.rotate180()),
        ResolvedFilter::Mirror => Ok(image.fliph()),
        ResolvedFilter::Pixelate => Ok(pixelate(image, dims)),
        ResolvedFilter::Jpegify { quality } => jpegify(image, *quality),
        ResolvedFilter::BlackWhite => Ok(DynamicImage::ImageLuma8(to_luma_601(&image.to_rgba8()))),
        ResolvedFilter::Sepia => Ok(sepia(image)),
        ResolvedFilter::Deepfry => Ok(deepfry(image, dims)),
        ResolvedFilter::Wide => Ok(wide(image, dims)),
        ResolvedFilter::Overlay(path) => overlay(image, path, dims),
    }
}

/// Recombine RGB only and invert each channel; alpha is dropped.
fn invert(image: DynamicImage) -> DynamicImage {
    let mut rgb = image.to_rgb8();
    imageops::invert(&mut rgb);
    DynamicImage::ImageRgb8(rgb)
}

fn pixelate(image: DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    let rgba = image.to_rgba8();
    let rgba = enhance_saturation(rgba, 1.25);
    let rgba = enhance_contrast(rgba, 1.2);
    let rgba = quantize_adaptive(rgba);

    let reduced_w = (width / SUPERPIXEL_SIZE).max(1);
    let reduced_h = (height / SUPERPIXEL_SIZE).max(1);
    let reduced = imageops::resize(&rgba, reduced_w, reduced_h, FilterType::CatmullRom);
    let restored = imageops::resize(&reduced, width.max(1), height.max(1), FilterType::Lanczos3);
    DynamicImage::ImageRgba8(restored)
}

/// Re-encode as JPEG at a very low quality and decode the result back, so
/// the compression artifacts are what the caller gets. Returning a decoded
/// frame keeps this filter uniform across the static and animated paths.
fn jpegify(image: DynamicImage, quality: u8) -> GlazeResult<DynamicImage> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .context("jpegify: encode jpeg")?;
    let degraded = image::load_from_memory_with_format(&buf, image::ImageFormat::Jpeg)
        .context("jpegify: decode jpeg back")?;
    Ok(degraded)
}

fn sepia(image: DynamicImage) -> DynamicImage {
    let mut rgba = image.to_rgba8();
    for px in rgba.chunks_exact_mut(4) {
        let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
        let tr = 0.393 * r + 0.769 * g + 0.189 * b;
        let tg = 0.349 * r + 0.686 * g + 0.168 * b;
        let tb = 0.272 * r + 0.534 * g + 0.131 * b;
        px[0] = tr.min(255.0) as u8;
        px[1] = tg.min(255.0) as u8;
        px[2] = tb.min(255.0) as u8;
    }
    DynamicImage::ImageRgba8(rgba)
}

fn deepfry(image: DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    let frac = |v: u32, exp: f64| (f64::from(v).powf(exp) as u32).max(1);

    let rgb = image.to_rgb8();
    let img = imageops::resize(
        &rgb,
        frac(width, 0.75),
        frac(height, 0.75),
        FilterType::Lanczos3,
    );
    let img = imageops::resize(
        &img,
        frac(width, 0.88),
        frac(height, 0.88),
        FilterType::Triangle,
    );
    let img = imageops::resize(
        &img,
        frac(width, 0.9),
        frac(height, 0.9),
        FilterType::CatmullRom,
    );
    let mut img = imageops::resize(&img, width.max(1), height.max(1), FilterType::CatmullRom);

    // Posterize to 4 bits per channel.
    for v in img.iter_mut() {
        *v &= 0xF0;
    }

    // Red channel, contrast-boosted then brightened, colorized over a
    // red-to-yellow ramp.
    let mut red = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        image::Luma([img.get_pixel(x, y)[0]])
    });
    gray_contrast(&mut red, 2.0);
    for v in red.iter_mut() {
        *v = blend_u8(0, *v, 1.5);
    }
    let colorized = colorize(&red, [254, 0, 2], [255, 255, 15]);

    // Blend the colorized channel back at 0.75 opacity, then sharpen hard.
    for (dst, src) in img.iter_mut().zip(colorized.iter()) {
        *dst = blend_u8(*dst, *src, 0.75);
    }
    let smooth = imageops::filter3x3(&img, &SMOOTH_KERNEL);
    let mut sharpened = img;
    for (dst, s) in sharpened.iter_mut().zip(smooth.iter()) {
        *dst = blend_u8(*s, *dst, 100.0);
    }
    DynamicImage::ImageRgb8(sharpened)
}

fn wide(image: DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
    let blurred = image.blur(1.5);
    let out_w = ((f64::from(width) * 1.25) as u32).max(1);
    let out_h = ((f64::from(height) / 1.5) as u32).max(1);
    blurred.resize_exact(out_w, out_h, FilterType::CatmullRom)
}

/// Resize the named asset to the target dimensions and alpha-composite it
/// onto the input at the origin.
fn overlay(
    image: DynamicImage,
    path: &std::path::Path,
    dims: (u32, u32),
) -> GlazeResult<DynamicImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read overlay asset '{}'", path.display()))?;
    let asset = image::load_from_memory(&bytes)
        .with_context(|| format!("decode overlay asset '{}'", path.display()))?;
    let asset = asset
        .resize_exact(dims.0.max(1), dims.1.max(1), FilterType::CatmullRom)
        .to_rgba8();

    let mut base = image.to_rgba8();
    imageops::overlay(&mut base, &asset, 0, 0);
    Ok(DynamicImage::ImageRgba8(base))
}

/// ITU-R 601-2 luma, the weighting classic raster pipelines use for
/// grayscale conversion.
fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000) >> 16) as u8
}

fn to_luma_601(rgba: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        image::Luma([luma_601(p[0], p[1], p[2])])
    })
}

/// `degenerate + (value - degenerate) * factor`, clamped to [0,255].
fn blend_u8(degenerate: u8, value: u8, factor: f32) -> u8 {
    let out = f32::from(degenerate) + (f32::from(value) - f32::from(degenerate)) * factor;
    out.round().clamp(0.0, 255.0) as u8
}

/// Saturation boost: interpolate each RGB channel away from the pixel's own
/// luma. Alpha is untouched.
fn enhance_saturation(mut rgba: RgbaImage, factor: f32) -> RgbaImage {
    for px in rgba.chunks_exact_mut(4) {
        let gray = luma_601(px[0], px[1], px[2]);
        for c in px.iter_mut().take(3) {
            *c = blend_u8(gray, *c, factor);
        }
    }
    rgba
}

/// Contrast boost: interpolate each RGB channel away from the image's mean
/// luma. Alpha is untouched.
fn enhance_contrast(mut rgba: RgbaImage, factor: f32) -> RgbaImage {
    let pixel_count = (u64::from(rgba.width()) * u64::from(rgba.height())).max(1);
    let luma_sum: u64 = rgba
        .chunks_exact(4)
        .map(|px| u64::from(luma_601(px[0], px[1], px[2])))
        .sum();
    let mean = ((luma_sum as f64 / pixel_count as f64) + 0.5) as u8;

    for px in rgba.chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            *c = blend_u8(mean, *c, factor);
        }
    }
    rgba
}

fn gray_contrast(gray: &mut GrayImage, factor: f32) {
    let pixel_count = (u64::from(gray.width()) * u64::from(gray.height())).max(1);
    let sum: u64 = gray.iter().map(|&v| u64::from(v)).sum();
    let mean = ((sum as f64 / pixel_count as f64) + 0.5) as u8;
    for v in gray.iter_mut() {
        *v = blend_u8(mean, *v, factor);
    }
}

/// Map a single-channel image onto a dark-to-light color ramp.
fn colorize(gray: &GrayImage, dark: [u8; 3], light: [u8; 3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(gray.len() * 3);
    for &v in gray.iter() {
        let t = u32::from(v);
        for c in 0..3 {
            let d = u32::from(dark[c]);
            let l = u32::from(light[c]);
            out.push(((d * (255 - t) + l * t + 127) / 255) as u8);
        }
    }
    out
}

/// Quantize to a 256-color adaptive palette, keeping the RGBA layout.
fn quantize_adaptive(mut rgba: RgbaImage) -> RgbaImage {
    let nq = NeuQuant::new(10, 256, rgba.as_raw());
    let palette = nq.color_map_rgba();
    for px in rgba.chunks_exact_mut(4) {
        let idx = nq.index_of(px) * 4;
        px.copy_from_slice(&palette[idx..idx + 4]);
    }
    rgba
}
