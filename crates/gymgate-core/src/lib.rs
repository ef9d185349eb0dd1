//! gymgate-core — Face detection, encoding and member matching.
//!
//! Uses UltraFace for face detection and a MobileFaceNet-style
//! embedding model for face encoding, both running via ONNX Runtime
//! for CPU inference. The enrollment index maps member ids to one
//! reference encoding each, built from a directory of member photos.

pub mod detector;
pub mod encoder;
pub mod enrollment;
pub mod matcher;
pub mod pipeline;
mod resample;
pub mod types;

pub use detector::{DetectorError, FaceDetector};
pub use encoder::{EncoderError, FaceEncoder};
pub use enrollment::EnrollmentIndex;
pub use matcher::{FaceMatcher, MatchHit, NearestMatcher, DEFAULT_MATCH_THRESHOLD};
pub use pipeline::{AnalyzeError, FaceAnalyzer, FacePipeline};
pub use types::{Encoding, EnrolledFace, FaceBox};
