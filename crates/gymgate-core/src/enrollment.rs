//! Enrollment index built from a directory of member photos.
//!
//! Photos are named `<member_id>.<ext>` (jpg/jpeg/png). Each photo
//! contributes at most one reference encoding — the first face found in
//! the image. The index is rebuilt from disk at every recognition
//! session start and lives in memory only.

use crate::pipeline::FaceAnalyzer;
use crate::types::EnrolledFace;
use std::path::Path;

const PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// In-memory index of enrolled member encodings.
#[derive(Debug, Default)]
pub struct EnrollmentIndex {
    faces: Vec<EnrolledFace>,
}

impl EnrollmentIndex {
    /// Scan `photo_dir` and build the index.
    ///
    /// Individual failures never abort the rebuild: unreadable files,
    /// non-numeric filenames and photos with no detectable face are
    /// each logged and skipped. An unreadable directory yields an empty
    /// index.
    pub fn rebuild(photo_dir: &Path, analyzer: &mut impl FaceAnalyzer) -> Self {
        let mut faces = Vec::new();

        let entries = match std::fs::read_dir(photo_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(dir = %photo_dir.display(), error = %err, "cannot read photo directory");
                return Self { faces };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !has_photo_extension(&path) {
                continue;
            }

            let Some(member_id) = member_id_from_filename(&path) else {
                tracing::warn!(file = %path.display(), "photo filename is not a member id, skipped");
                continue;
            };

            let image = match image::open(&path) {
                Ok(image) => image.to_luma8(),
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "could not read photo, skipped");
                    continue;
                }
            };

            let (width, height) = (image.width(), image.height());
            match analyzer.first_face_encoding(image.as_raw(), width, height) {
                Ok(Some(encoding)) => {
                    faces.push(EnrolledFace { member_id, encoding });
                }
                Ok(None) => {
                    tracing::info!(file = %path.display(), "no face found in photo, skipped");
                }
                Err(err) => {
                    tracing::warn!(file = %path.display(), error = %err, "face analysis failed, skipped");
                }
            }
        }

        tracing::info!(count = faces.len(), dir = %photo_dir.display(), "enrollment index rebuilt");
        Self { faces }
    }

    /// Build an index from already-computed encodings.
    pub fn from_faces(faces: Vec<EnrolledFace>) -> Self {
        Self { faces }
    }

    pub fn faces(&self) -> &[EnrolledFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn has_photo_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PHOTO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Member id is the numeric file stem (e.g. `7.jpg` → 7).
fn member_id_from_filename(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AnalyzeError;
    use crate::types::Encoding;
    use image::{ImageBuffer, Luma};

    /// Reports a face (encoding = normalized mean brightness) for any
    /// photo brighter than the cutoff, no face otherwise.
    struct BrightnessAnalyzer {
        cutoff: u8,
    }

    impl FaceAnalyzer for BrightnessAnalyzer {
        fn encodings_in(
            &mut self,
            frame: &[u8],
            _width: u32,
            _height: u32,
        ) -> Result<Vec<Encoding>, AnalyzeError> {
            let mean = frame.iter().map(|&p| p as u32).sum::<u32>() / frame.len().max(1) as u32;
            if mean as u8 > self.cutoff {
                Ok(vec![Encoding { values: vec![mean as f32 / 255.0, 0.0] }])
            } else {
                Ok(vec![])
            }
        }
    }

    fn write_photo(dir: &Path, name: &str, brightness: u8) {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(4, 4, Luma([brightness]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_rebuild_indexes_valid_photos() {
        let dir = tempfile::tempdir().unwrap();
        write_photo(dir.path(), "7.png", 200);
        write_photo(dir.path(), "12.jpg", 180);

        let mut analyzer = BrightnessAnalyzer { cutoff: 10 };
        let index = EnrollmentIndex::rebuild(dir.path(), &mut analyzer);

        assert_eq!(index.len(), 2);
        let mut ids: Vec<i64> = index.faces().iter().map(|f| f.member_id).collect();
        ids.sort();
        assert_eq!(ids, vec![7, 12]);
    }

    #[test]
    fn test_rebuild_skips_faceless_photo() {
        let dir = tempfile::tempdir().unwrap();
        write_photo(dir.path(), "7.png", 200);
        write_photo(dir.path(), "8.png", 0); // too dark → "no face"

        let mut analyzer = BrightnessAnalyzer { cutoff: 10 };
        let index = EnrollmentIndex::rebuild(dir.path(), &mut analyzer);

        assert_eq!(index.len(), 1);
        assert_eq!(index.faces()[0].member_id, 7);
    }

    #[test]
    fn test_rebuild_skips_unreadable_and_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        write_photo(dir.path(), "3.png", 150);
        std::fs::write(dir.path().join("9.jpg"), b"not an image").unwrap();
        write_photo(dir.path(), "logo.png", 150);
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let mut analyzer = BrightnessAnalyzer { cutoff: 10 };
        let index = EnrollmentIndex::rebuild(dir.path(), &mut analyzer);

        assert_eq!(index.len(), 1);
        assert_eq!(index.faces()[0].member_id, 3);
    }

    #[test]
    fn test_rebuild_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let mut analyzer = BrightnessAnalyzer { cutoff: 10 };
        let index = EnrollmentIndex::rebuild(&missing, &mut analyzer);

        assert!(index.is_empty());
    }
}
