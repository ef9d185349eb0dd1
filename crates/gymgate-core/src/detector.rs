//! UltraFace face detector via ONNX Runtime.
//!
//! Runs the version-RFB-320 UltraFace model, which emits pre-decoded
//! per-anchor scores and normalized corner boxes, so post-processing is
//! confidence filtering plus NMS — no anchor reconstruction.

use crate::resample::resize_bilinear;
use crate::types::FaceBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const DETECT_INPUT_WIDTH: usize = 320;
const DETECT_INPUT_HEIGHT: usize = 240;
const DETECT_MEAN: f32 = 127.0;
const DETECT_STD: f32 = 128.0;
const DETECT_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECT_NMS_IOU_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// UltraFace-based face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the UltraFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face detection model"
        );

        Ok(Self { session })
    }

    /// Detect faces in a grayscale frame.
    ///
    /// Returns boxes in source-image pixel coordinates, sorted by
    /// confidence descending.
    pub fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBox>, DetectorError> {
        let input = Self::preprocess(frame, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        if outputs.len() < 2 {
            return Err(DetectorError::InferenceFailed(format!(
                "detector requires 2 outputs (scores, boxes), got {}",
                outputs.len()
            )));
        }

        let (_, first) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, second) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        // Scores are [1, N, 2]; boxes are [1, N, 4]. Output order varies
        // between exports, so identify by element count.
        let (scores, boxes) = if first.len() < second.len() {
            (first, second)
        } else {
            (second, first)
        };

        let anchors = scores.len() / 2;
        if boxes.len() != anchors * 4 {
            return Err(DetectorError::InferenceFailed(format!(
                "score/box shape mismatch: {} scores vs {} box values",
                scores.len(),
                boxes.len()
            )));
        }

        let mut candidates = Vec::new();
        for i in 0..anchors {
            let confidence = scores[i * 2 + 1];
            if confidence < DETECT_CONFIDENCE_THRESHOLD {
                continue;
            }
            // Normalized corners → source pixels.
            let x1 = boxes[i * 4] * width as f32;
            let y1 = boxes[i * 4 + 1] * height as f32;
            let x2 = boxes[i * 4 + 2] * width as f32;
            let y2 = boxes[i * 4 + 3] * height as f32;
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            candidates.push(FaceBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
                confidence,
            });
        }

        let mut faces = nms(candidates, DETECT_NMS_IOU_THRESHOLD);
        faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(faces)
    }

    /// Resize a grayscale frame to the model input and normalize into a
    /// NCHW float tensor, replicating gray across 3 channels.
    fn preprocess(frame: &[u8], width: usize, height: usize) -> Array4<f32> {
        let resized = resize_bilinear(frame, width, height, DETECT_INPUT_WIDTH, DETECT_INPUT_HEIGHT);
        let mut tensor = Array4::<f32>::zeros((1, 3, DETECT_INPUT_HEIGHT, DETECT_INPUT_WIDTH));

        for y in 0..DETECT_INPUT_HEIGHT {
            for x in 0..DETECT_INPUT_WIDTH {
                let normalized = (resized[y * DETECT_INPUT_WIDTH + x] as f32 - DETECT_MEAN) / DETECT_STD;
                tensor[[0, 0, y, x]] = normalized;
                tensor[[0, 1, y, x]] = normalized;
                tensor[[0, 2, y, x]] = normalized;
            }
        }

        tensor
    }
}

/// Intersection-over-union of two face boxes.
fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression by descending confidence.
fn nms(mut candidates: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<FaceBox> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> FaceBox {
        FaceBox { x, y, width: w, height: h, confidence }
    }

    #[test]
    fn test_iou_identical() {
        let a = face(10.0, 10.0, 20.0, 20.0, 0.9);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = face(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = face(100.0, 100.0, 10.0, 10.0, 0.9);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // Two 10x10 boxes offset by 5 in x: intersection 50, union 150.
        let a = face(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = face(5.0, 0.0, 10.0, 10.0, 0.9);
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let candidates = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.8),
            face(1.0, 1.0, 10.0, 10.0, 0.95),
            face(50.0, 50.0, 10.0, 10.0, 0.7),
        ];
        let kept = nms(candidates, 0.3);
        assert_eq!(kept.len(), 2);
        // Highest-confidence overlapping box survives.
        assert!((kept[0].confidence - 0.95).abs() < 1e-6);
        assert!((kept[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint() {
        let candidates = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.9),
            face(20.0, 0.0, 10.0, 10.0, 0.8),
            face(40.0, 0.0, 10.0, 10.0, 0.7),
        ];
        assert_eq!(nms(candidates, 0.3).len(), 3);
    }

    #[test]
    fn test_preprocess_shape_and_channels() {
        let frame = vec![127u8; 64 * 48];
        let tensor = FaceDetector::preprocess(&frame, 64, 48);
        assert_eq!(tensor.shape(), &[1, 3, DETECT_INPUT_HEIGHT, DETECT_INPUT_WIDTH]);
        // Pixel 127 normalizes to exactly 0, replicated on all channels.
        assert_eq!(tensor[[0, 0, 10, 10]], 0.0);
        assert_eq!(tensor[[0, 1, 10, 10]], tensor[[0, 2, 10, 10]]);
    }
}
