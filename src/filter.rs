use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{GlazeError, GlazeResult};

/// Built-in transform names, in the order the listing endpoint reports them.
pub const BUILTIN_NAMES: [&str; 10] = [
    "blur", "invert", "b&w", "deepfry", "sepia", "pixelate", "jpegify", "wide", "flip", "mirror",
];

/// Raster extensions an overlay asset may use.
const OVERLAY_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// A filter name resolved at request entry. Resolution is total: every name
/// maps to a built-in variant, a found overlay asset, or a `NotFound` error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedFilter {
    Blur,
    Invert,
    Flip,
    Mirror,
    Pixelate,
    /// JPEG recompression quality, sampled once at resolution time.
    Jpegify { quality: u8 },
    BlackWhite,
    Sepia,
    Deepfry,
    Wide,
    /// Static asset composited over the input, resolved to its file path.
    Overlay(PathBuf),
}

impl ResolvedFilter {
    /// Resolve `name` against the built-in table, then the overlay asset
    /// directory. `rng` pins the `jpegify` quality for tests.
    pub fn resolve(name: &str, assets_dir: &Path, rng: &mut impl Rng) -> GlazeResult<Self> {
        let filter = match name {
            "blur" => Self::Blur,
            "invert" => Self::Invert,
            "flip" => Self::Flip,
            "mirror" => Self::Mirror,
            "pixelate" => Self::Pixelate,
            "jpegify" => Self::Jpegify {
                quality: rng.random_range(1..=11),
            },
            "b&w" => Self::BlackWhite,
            "sepia" => Self::Sepia,
            "deepfry" => Self::Deepfry,
            "wide" => Self::Wide,
            other => {
                let path = find_overlay(other, assets_dir)
                    .ok_or_else(|| GlazeError::not_found(format!("no filter named '{other}'")))?;
                Self::Overlay(path)
            }
        };
        Ok(filter)
    }

    /// Maximum animated frame count this filter accepts, if limited.
    pub fn frame_limit(&self) -> Option<usize> {
        match self {
            Self::Sepia => Some(150),
            _ => None,
        }
    }
}

fn find_overlay(name: &str, assets_dir: &Path) -> Option<PathBuf> {
    // Asset names are flat file stems; anything path-like is rejected before
    // it can escape the asset directory.
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..")
    {
        return None;
    }
    OVERLAY_EXTENSIONS.iter().find_map(|ext| {
        let candidate = assets_dir.join(format!("{name}.{ext}"));
        candidate.is_file().then_some(candidate)
    })
}

/// All discoverable filter names: the built-in table plus the base name of
/// every file in the overlay asset directory. A missing or unreadable asset
/// directory yields just the built-ins.
pub fn list_filters(assets_dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = BUILTIN_NAMES.iter().map(|n| (*n).to_string()).collect();

    let mut assets = Vec::new();
    if let Ok(entries) = std::fs::read_dir(assets_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                assets.push(stem.to_string());
            }
        }
    }
    assets.sort();
    assets.dedup();
    names.extend(assets);
    names
}
