//! Capture session state machine.
//!
//! Walks a caller through the display sequence (optional white/black
//! references, then every bit-plane), averages the submitted exposures for
//! each step and hands the finished set to the decoder. Display and camera
//! timing stay with the caller.

use serde::{Deserialize, Serialize};

use super::decoder::{CorrespondenceDecoder, DecodeOptions, DecodedCorrespondences};
use super::gray_code::{CapturePattern, PatternConfig};
use crate::error::ConfigurationError;
use crate::raster::{CapturedFrame, Raster};

/// State of the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting to start.
    Idle,
    /// Projecting white reference.
    WhiteReference,
    /// Projecting black reference.
    BlackReference,
    /// Projecting Gray code plane.
    ProjectingPattern { pattern_index: usize },
    /// Every frame captured.
    ReadyToDecode,
    /// Stopped by the caller before completion.
    Cancelled,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(
            self,
            CaptureState::WhiteReference
                | CaptureState::BlackReference
                | CaptureState::ProjectingPattern { .. }
        )
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CaptureState::ReadyToDecode)
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::WhiteReference => write!(f, "White Reference"),
            CaptureState::BlackReference => write!(f, "Black Reference"),
            CaptureState::ProjectingPattern { pattern_index } => {
                write!(f, "Pattern {}", pattern_index)
            }
            CaptureState::ReadyToDecode => write!(f, "Ready To Decode"),
            CaptureState::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Configuration for a capture run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Number of exposures averaged for each pattern.
    pub frames_to_average: usize,
    /// Capture the white/black reference pair before the planes.
    pub use_reference: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frames_to_average: 3,
            use_reference: true,
        }
    }
}

/// Manages one capture run for a single projector.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    /// Current state.
    state: CaptureState,
    config: CaptureConfig,
    pattern_config: PatternConfig,
    camera_width: u32,
    camera_height: u32,
    /// Averaged frame per completed step, in display order.
    captured: Vec<CapturedFrame>,
    /// Exposures of the current step.
    accumulated_frames: Vec<CapturedFrame>,
}

impl CaptureSession {
    pub fn new(
        pattern_config: PatternConfig,
        camera_width: u32,
        camera_height: u32,
        config: CaptureConfig,
    ) -> Result<Self, ConfigurationError> {
        if camera_width == 0 || camera_height == 0 {
            return Err(ConfigurationError::InvalidGeometry {
                width: camera_width,
                height: camera_height,
            });
        }

        Ok(Self {
            state: CaptureState::Idle,
            config,
            pattern_config,
            camera_width,
            camera_height,
            captured: Vec::new(),
            accumulated_frames: Vec::new(),
        })
    }

    /// Session sized for a decoder's camera and projector.
    pub fn for_decoder(
        decoder: &CorrespondenceDecoder,
        config: CaptureConfig,
    ) -> Result<Self, ConfigurationError> {
        let (width, height) = decoder.camera_dimensions();
        Self::new(*decoder.pattern_config(), width, height, config)
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Start (or restart) the capture sequence.
    pub fn start(&mut self) {
        self.captured.clear();
        self.accumulated_frames.clear();
        self.state = self.step_state(0);

        log::info!(
            "Starting capture: {} steps, {} exposure(s) each",
            self.sequence_len(),
            self.config.frames_to_average.max(1)
        );
    }

    /// Cancel the capture.
    pub fn cancel(&mut self) {
        self.state = CaptureState::Cancelled;
        self.accumulated_frames.clear();
        log::info!("Capture cancelled");
    }

    /// Pattern to display, `None` when not capturing.
    pub fn current_pattern(&self) -> Option<CapturePattern> {
        match self.state {
            CaptureState::WhiteReference => Some(CapturePattern::White),
            CaptureState::BlackReference => Some(CapturePattern::Black),
            CaptureState::ProjectingPattern { pattern_index } => {
                Some(CapturePattern::Plane(pattern_index))
            }
            _ => None,
        }
    }

    /// Get progress (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        match self.state {
            CaptureState::ReadyToDecode => 1.0,
            CaptureState::Idle | CaptureState::Cancelled => 0.0,
            _ => self.captured.len() as f32 / self.sequence_len().max(1) as f32,
        }
    }

    /// Submit a captured camera frame for the current pattern.
    ///
    /// Frames arriving outside a capturing state are ignored.
    pub fn submit_frame(&mut self, frame: CapturedFrame) -> Result<(), ConfigurationError> {
        if !self.state.is_capturing() {
            log::debug!("Ignoring frame submitted in state {}", self.state);
            return Ok(());
        }

        let (width, height) = frame.dimensions();
        if width != self.camera_width || height != self.camera_height {
            return Err(ConfigurationError::FrameSize {
                index: self.captured.len(),
                width,
                height,
                expected_width: self.camera_width,
                expected_height: self.camera_height,
            });
        }

        self.accumulated_frames.push(frame);
        if self.accumulated_frames.len() < self.config.frames_to_average.max(1) {
            return Ok(());
        }

        let averaged = self.average_frames();
        self.accumulated_frames.clear();
        self.captured.push(averaged);

        self.state = self.step_state(self.captured.len());
        log::debug!("Captured step {}, now {}", self.captured.len(), self.state);
        Ok(())
    }

    /// Captured frames in the order [`CorrespondenceDecoder::decode`] expects.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.captured
    }

    /// Decode the finished capture.
    ///
    /// Only a session in [`CaptureState::ReadyToDecode`] decodes; a cancelled
    /// session is rejected even if every frame had arrived.
    pub fn decode<'d>(
        &self,
        decoder: &'d mut CorrespondenceDecoder,
        options: &DecodeOptions,
    ) -> Result<&'d DecodedCorrespondences, ConfigurationError> {
        if !self.state.is_complete() {
            return Err(ConfigurationError::CaptureNotReady { state: self.state });
        }
        decoder.decode(&self.captured, options)
    }

    fn sequence_len(&self) -> usize {
        let reference = if self.config.use_reference { 2 } else { 0 };
        self.pattern_config.total_planes() + reference
    }

    /// State for the `step`-th image of the display sequence.
    fn step_state(&self, step: usize) -> CaptureState {
        let planes_start = if self.config.use_reference { 2 } else { 0 };
        if step >= self.sequence_len() {
            CaptureState::ReadyToDecode
        } else if step < planes_start {
            if step == 0 {
                CaptureState::WhiteReference
            } else {
                CaptureState::BlackReference
            }
        } else {
            CaptureState::ProjectingPattern {
                pattern_index: step - planes_start,
            }
        }
    }

    /// Average accumulated frames.
    fn average_frames(&self) -> Raster {
        let count = self.accumulated_frames.len() as u32;
        let mut sums = vec![0u32; self.accumulated_frames[0].as_slice().len()];

        for frame in &self.accumulated_frames {
            for (sum, &value) in sums.iter_mut().zip(frame.as_slice()) {
                *sum += value as u32;
            }
        }

        let mut averaged = Raster::new(self.camera_width, self.camera_height);
        for (dst, sum) in averaged.as_mut_slice().iter_mut().zip(sums) {
            *dst = (sum / count) as u8;
        }
        averaged
    }
}
