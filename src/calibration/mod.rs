//! Structured light pattern generation and decoding.

mod decoder;
mod gray_code;
mod session;

pub use decoder::{
    CorrespondenceDecoder, DecodeOptions, DecodeStats, DecodedCorrespondences, DecoderState,
    PixelStatus, DEFAULT_MIN_CONTRAST, DEFAULT_THRESHOLD,
};
pub use gray_code::{
    from_gray_code, planes_for, to_gray_code, CapturePattern, GrayCodeGenerator, PatternConfig,
    PatternDirection, PatternSpec,
};
pub use session::{CaptureConfig, CaptureSession, CaptureState};
