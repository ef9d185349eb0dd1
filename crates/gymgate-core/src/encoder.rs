//! Face encoder via ONNX Runtime.
//!
//! Produces 128-dimensional L2-normalized encodings from detected face
//! crops using a MobileFaceNet-style embedding model. The detector head
//! has no landmarks, so the crop is the detection box expanded by a
//! fixed margin and bilinear-resized to the model input.

use crate::resample::{crop, resize_bilinear};
use crate::types::{Encoding, FaceBox};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const ENCODE_INPUT_SIZE: usize = 112;
const ENCODE_MEAN: f32 = 127.5;
const ENCODE_STD: f32 = 127.5;
const ENCODING_DIM: usize = 128;
/// Fraction of the detection box added on every side before encoding.
const CROP_MARGIN: f32 = 0.2;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face crop is empty (box outside the frame)")]
    EmptyCrop,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Embedding-model face encoder.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    /// Load the embedding ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded face encoding model");

        Ok(Self { session })
    }

    /// Encode one detected face from a grayscale frame.
    pub fn encode(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &FaceBox,
    ) -> Result<Encoding, EncoderError> {
        let margin_x = (face.width * CROP_MARGIN) as i64;
        let margin_y = (face.height * CROP_MARGIN) as i64;
        let (cropped, cw, ch) = crop(
            frame,
            width as usize,
            height as usize,
            face.x as i64 - margin_x,
            face.y as i64 - margin_y,
            face.width as i64 + 2 * margin_x,
            face.height as i64 + 2 * margin_y,
        );
        if cw == 0 || ch == 0 {
            return Err(EncoderError::EmptyCrop);
        }

        let input = Self::preprocess(&cropped, cw, ch);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::InferenceFailed(format!("encoding extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();
        if raw.len() != ENCODING_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {ENCODING_DIM}-dim encoding, got {}",
                raw.len()
            )));
        }

        Ok(Encoding { values: l2_normalize(raw) })
    }

    /// Resize a face crop to 112×112 and normalize into a NCHW float
    /// tensor, gray replicated across 3 channels.
    fn preprocess(cropped: &[u8], crop_w: usize, crop_h: usize) -> Array4<f32> {
        let size = ENCODE_INPUT_SIZE;
        let resized = resize_bilinear(cropped, crop_w, crop_h, size, size);
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for y in 0..size {
            for x in 0..size {
                let normalized = (resized[y * size + x] as f32 - ENCODE_MEAN) / ENCODE_STD;
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }

        tensor
    }
}

/// L2-normalize a vector; zero vectors pass through unchanged.
fn l2_normalize(raw: Vec<f32>) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_output_shape() {
        let cropped = vec![128u8; 50 * 40];
        let tensor = FaceEncoder::preprocess(&cropped, 50, 40);
        assert_eq!(tensor.shape(), &[1, 3, ENCODE_INPUT_SIZE, ENCODE_INPUT_SIZE]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let cropped = vec![128u8; 30 * 30];
        let tensor = FaceEncoder::preprocess(&cropped, 30, 30);
        let expected = (128.0 - ENCODE_MEAN) / ENCODE_STD;
        assert!((tensor[[0, 0, 5, 5]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_channels_identical() {
        let cropped: Vec<u8> = (0..(20 * 20)).map(|i| (i % 251) as u8).collect();
        let tensor = FaceEncoder::preprocess(&cropped, 20, 20);
        for y in 0..ENCODE_INPUT_SIZE {
            for x in 0..ENCODE_INPUT_SIZE {
                assert_eq!(tensor[[0, 0, y, x]], tensor[[0, 1, y, x]]);
                assert_eq!(tensor[[0, 1, y, x]], tensor[[0, 2, y, x]]);
            }
        }
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
