use serde::{Deserialize, Serialize};

/// Rectangle of a detected face in source-image pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face feature vector (128-dimensional, L2-normalized by the encoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    /// Euclidean distance between two encodings. Lower = more similar.
    pub fn distance(&self, other: &Encoding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One enrolled member face: the reference encoding built from that
/// member's enrollment photo. At most one per member.
#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub member_id: i64,
    pub encoding: Encoding,
}
