//! Detection + encoding pipeline behind the `FaceAnalyzer` seam.
//!
//! The session loop and the enrollment index both consume faces through
//! `FaceAnalyzer`, so tests can drive them with scripted analyzers and
//! no model files.

use crate::detector::{DetectorError, FaceDetector};
use crate::encoder::{EncoderError, FaceEncoder};
use crate::types::Encoding;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// Turns a grayscale frame into face encodings.
pub trait FaceAnalyzer {
    /// Encodings for every detected face in the frame.
    fn encodings_in(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Encoding>, AnalyzeError>;

    /// Encoding of the first detected face only (enrollment path).
    fn first_face_encoding(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Encoding>, AnalyzeError> {
        Ok(self.encodings_in(frame, width, height)?.into_iter().next())
    }
}

/// Production analyzer: ONNX detector followed by the ONNX encoder.
pub struct FacePipeline {
    detector: FaceDetector,
    encoder: FaceEncoder,
}

impl FacePipeline {
    pub fn new(detector: FaceDetector, encoder: FaceEncoder) -> Self {
        Self { detector, encoder }
    }

    /// Load both models from their file paths.
    pub fn load(detector_path: &str, encoder_path: &str) -> Result<Self, AnalyzeError> {
        let detector = FaceDetector::load(detector_path)?;
        let encoder = FaceEncoder::load(encoder_path)?;
        Ok(Self { detector, encoder })
    }
}

impl FaceAnalyzer for FacePipeline {
    fn encodings_in(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Encoding>, AnalyzeError> {
        let faces = self.detector.detect(frame, width, height)?;
        let mut encodings = Vec::with_capacity(faces.len());
        for face in &faces {
            encodings.push(self.encoder.encode(frame, width, height, face)?);
        }
        Ok(encodings)
    }

    fn first_face_encoding(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Encoding>, AnalyzeError> {
        let faces = self.detector.detect(frame, width, height)?;
        match faces.first() {
            Some(face) => Ok(Some(self.encoder.encode(frame, width, height, face)?)),
            None => Ok(None),
        }
    }
}
