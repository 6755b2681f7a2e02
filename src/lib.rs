#![forbid(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod fx;
pub mod pipeline;
pub mod sequence;
pub mod server;

pub use decode::{AnimationFrame, DecodedInput, decode_input};
pub use encode::{OutputFormat, Rendered};
pub use error::{GlazeError, GlazeResult};
pub use filter::{BUILTIN_NAMES, ResolvedFilter, list_filters};
pub use pipeline::render;
pub use sequence::FrameSequence;
pub use server::{AppState, router, serve};
