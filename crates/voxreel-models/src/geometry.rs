//! Frame geometry: aspect ratios and crop/scale planning.
//!
//! Every clip in a pool is normalized to the target aspect ratio before
//! composition. The planner prefers a center crop that never upscales;
//! the scale-then-crop variant exists only for malformed inputs where a
//! pure crop would have to upscale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A display aspect ratio expressed as width:height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard widescreen (16:9), the engine default.
    pub const WIDESCREEN: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// Errors from parsing an aspect ratio string.
#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("invalid aspect ratio format: {0} (expected W:H)")]
    InvalidFormat(String),

    #[error("invalid number in aspect ratio: {0}")]
    InvalidNumber(String),

    #[error("aspect ratio components must be non-zero")]
    ZeroValue,
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

/// A normalization plan for one clip's frames.
///
/// `Crop` is the normal path: a center crop at native resolution.
/// `ScaleCrop` downscales first and only activates when the wanted crop
/// extent exceeds the source frame, which cannot happen for
/// well-formed probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FramePlan {
    Crop {
        out_w: u32,
        out_h: u32,
        x: u32,
        y: u32,
    },
    ScaleCrop {
        scale_w: u32,
        scale_h: u32,
        out_w: u32,
        out_h: u32,
        x: u32,
        y: u32,
    },
}

impl FramePlan {
    /// Plan the crop (or downscale-then-crop) that maps a `width` x
    /// `height` frame onto the target `ratio`.
    ///
    /// Sources proportionally wider than the target keep their height
    /// and lose columns from both edges; sources at or below the target
    /// ratio keep their width and lose rows. Crop offsets are centered
    /// with floor division, so an odd-pixel remainder is dropped from
    /// the trailing edge.
    pub fn plan(width: u32, height: u32, ratio: AspectRatio) -> FramePlan {
        let r = ratio.as_f64();
        let source_ratio = width as f64 / height as f64;

        if source_ratio > r {
            // Wider than target: horizontal center crop at full height.
            let target_w = (height as f64 * r).round() as u32;
            if target_w <= width {
                FramePlan::Crop {
                    out_w: target_w,
                    out_h: height,
                    x: (width - target_w) / 2,
                    y: 0,
                }
            } else {
                // Width cannot supply the crop: shrink until it fits,
                // then crop rows on the rescaled frame.
                let scale = width as f64 / target_w as f64;
                let scale_w = (width as f64 * scale).round() as u32;
                let scale_h = (height as f64 * scale).round() as u32;
                let out_h = ((scale_w as f64 / r).round() as u32).min(scale_h);
                FramePlan::ScaleCrop {
                    scale_w,
                    scale_h,
                    out_w: scale_w,
                    out_h,
                    x: 0,
                    y: (scale_h - out_h) / 2,
                }
            }
        } else {
            // Taller (or equal): vertical center crop at full width.
            let target_h = (width as f64 / r).round() as u32;
            if target_h <= height {
                FramePlan::Crop {
                    out_w: width,
                    out_h: target_h,
                    x: 0,
                    y: (height - target_h) / 2,
                }
            } else {
                let scale = height as f64 / target_h as f64;
                let scale_w = (width as f64 * scale).round() as u32;
                let scale_h = (height as f64 * scale).round() as u32;
                let out_w = ((scale_h as f64 * r).round() as u32).min(scale_w);
                FramePlan::ScaleCrop {
                    scale_w,
                    scale_h,
                    out_w,
                    out_h: scale_h,
                    x: (scale_w - out_w) / 2,
                    y: 0,
                }
            }
        }
    }

    /// Output frame width after the plan is applied.
    pub fn out_w(&self) -> u32 {
        match *self {
            FramePlan::Crop { out_w, .. } | FramePlan::ScaleCrop { out_w, .. } => out_w,
        }
    }

    /// Output frame height after the plan is applied.
    pub fn out_h(&self) -> u32 {
        match *self {
            FramePlan::Crop { out_h, .. } | FramePlan::ScaleCrop { out_h, .. } => out_h,
        }
    }

    /// True if this plan rescales before cropping.
    pub fn is_scaled(&self) -> bool {
        matches!(self, FramePlan::ScaleCrop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: AspectRatio = AspectRatio::WIDESCREEN;

    #[test]
    fn test_parse_aspect_ratio() {
        let r: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(r, AspectRatio::WIDESCREEN);
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("16:0".parse::<AspectRatio>().is_err());
        assert!("a:9".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_wider_source_crops_columns() {
        // 21:9 ultrawide -> keep height, crop left and right.
        let plan = FramePlan::plan(2560, 1080, R);
        assert_eq!(
            plan,
            FramePlan::Crop {
                out_w: 1920,
                out_h: 1080,
                x: 320,
                y: 0,
            }
        );
    }

    #[test]
    fn test_taller_source_crops_rows() {
        // Portrait phone footage -> keep width, crop top and bottom.
        let plan = FramePlan::plan(1080, 1920, R);
        assert_eq!(
            plan,
            FramePlan::Crop {
                out_w: 1080,
                out_h: 608,
                x: 0,
                y: 656,
            }
        );
    }

    #[test]
    fn test_exact_ratio_is_identity_crop() {
        let plan = FramePlan::plan(1920, 1080, R);
        assert_eq!(
            plan,
            FramePlan::Crop {
                out_w: 1920,
                out_h: 1080,
                x: 0,
                y: 0,
            }
        );
        assert!(!plan.is_scaled());
    }

    #[test]
    fn test_odd_remainder_dropped_from_trailing_edge() {
        // 853x480 is a hair wider than 16:9; crop to 853 wide -> offset 0.
        let plan = FramePlan::plan(854, 480, R);
        match plan {
            FramePlan::Crop { out_w, out_h, x, .. } => {
                assert_eq!(out_h, 480);
                assert_eq!(out_w, 853);
                // (854 - 853) / 2 floors to zero; the extra column stays
                // on the trailing edge.
                assert_eq!(x, 0);
            }
            other => panic!("expected crop plan, got {:?}", other),
        }
    }

    #[test]
    fn test_aspect_invariant_on_common_resolutions() {
        let dims = [
            (1920u32, 1080u32),
            (1280, 720),
            (3840, 2160),
            (1080, 1920),
            (720, 1280),
            (1440, 1080),
            (1920, 800),
            (2560, 1080),
            (640, 480),
            (854, 480),
            (1620, 1080),
            (608, 1080),
        ];
        for (w, h) in dims {
            let plan = FramePlan::plan(w, h, R);
            let out_ratio = plan.out_w() as f64 / plan.out_h() as f64;
            assert!(
                (out_ratio - R.as_f64()).abs() < 1e-3,
                "{}x{} -> {}x{} ratio {}",
                w,
                h,
                plan.out_w(),
                plan.out_h(),
                out_ratio
            );
            if !plan.is_scaled() {
                assert!(plan.out_w() <= w, "{}x{} upscaled width", w, h);
                assert!(plan.out_h() <= h, "{}x{} upscaled height", w, h);
            }
        }
    }

    #[test]
    fn test_custom_ratio() {
        let square = AspectRatio::new(1, 1);
        let plan = FramePlan::plan(1920, 1080, square);
        assert_eq!(
            plan,
            FramePlan::Crop {
                out_w: 1080,
                out_h: 1080,
                x: 420,
                y: 0,
            }
        );
    }
}
