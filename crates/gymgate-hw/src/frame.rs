//! Frame type and pixel utilities — YUYV conversion and downscaling.

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

impl Frame {
    /// Box-downsample by an integer factor. Used to shrink frames before
    /// the expensive recognition pass; a factor of 4 matches the
    /// quarter-size recognition input.
    pub fn downscale(&self, factor: u32) -> Frame {
        if factor <= 1 {
            return self.clone();
        }

        let out_w = (self.width / factor).max(1);
        let out_h = (self.height / factor).max(1);
        let mut data = Vec::with_capacity((out_w * out_h) as usize);

        for oy in 0..out_h {
            for ox in 0..out_w {
                let mut sum = 0u32;
                for dy in 0..factor {
                    for dx in 0..factor {
                        let sx = (ox * factor + dx).min(self.width - 1);
                        let sy = (oy * factor + dy).min(self.height - 1);
                        sum += self.data[(sy * self.width + sx) as usize] as u32;
                    }
                }
                data.push((sum / (factor * factor)) as u8);
            }
        }

        Frame {
            data,
            width: out_w,
            height: out_h,
            sequence: self.sequence,
        }
    }
}
