//! Gallery matching for face encodings.
//!
//! Identifies a probe encoding against the enrolled gallery using
//! Euclidean distance with a fixed threshold. Selection is by nearest
//! distance: when several enrollments fall within the threshold, the
//! closest one wins, never the first in enrollment order.

use crate::types::{Encoding, EnrolledFace};

/// Default Euclidean match threshold for 128-d encodings.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// A positive identification against the gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub member_id: i64,
    pub distance: f32,
}

/// Strategy for identifying a probe encoding against enrolled faces.
pub trait FaceMatcher {
    fn identify(
        &self,
        probe: &Encoding,
        gallery: &[EnrolledFace],
        threshold: f32,
    ) -> Option<MatchHit>;
}

/// Nearest-distance matcher. Scans the whole gallery and returns the
/// minimum-distance entry if and only if it is within the threshold.
pub struct NearestMatcher;

impl FaceMatcher for NearestMatcher {
    fn identify(
        &self,
        probe: &Encoding,
        gallery: &[EnrolledFace],
        threshold: f32,
    ) -> Option<MatchHit> {
        let mut best: Option<MatchHit> = None;

        for face in gallery {
            let distance = probe.distance(&face.encoding);
            let is_better = match &best {
                None => true,
                Some(hit) => distance < hit.distance,
            };
            if is_better {
                best = Some(MatchHit {
                    member_id: face.member_id,
                    distance,
                });
            }
        }

        best.filter(|hit| hit.distance <= threshold)
    }
}
