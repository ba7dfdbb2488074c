// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine and batch configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Axis along which whole-surface detections are recognised.
///
/// `Vertical` rejects candidates spanning the full height of the frame,
/// `Horizontal` those spanning the full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDirection {
    #[default]
    Vertical,
    Horizontal,
}

/// Parameters of the candidate filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    /// Number of pages expected on one photograph.
    pub expected_page_count: usize,
    /// Candidates whose contour covers less than this fraction of the
    /// photograph end the scan.
    pub min_area_ratio: f64,
    /// Accepted width/height range of a page bounding box.
    pub aspect_ratio_range: [f64; 2],
    /// Wider range accepted with a warning.
    pub aspect_ratio_warn_range: Option<[f64; 2]>,
    /// Contour area over oriented-rectangle area below which a candidate is
    /// rejected.
    pub squarishness_min: f64,
    /// Squarishness below which an accepted page carries a warning.
    pub squarishness_warn: Option<f64>,
    pub direction: PageDirection,
    /// IoU above which a candidate duplicates an earlier one.
    pub duplicate_iou_threshold: f64,
    /// Relative area difference to the reference page allowed while fewer
    /// than `expected_page_count` pages are accepted.
    pub size_factor_loose: f64,
    /// Relative area difference allowed once the expected count is reached.
    pub size_factor_tight: f64,
    /// Distance in pixels within which a box edge counts as touching a frame
    /// or crop-window edge.
    pub edge_tolerance_px: f64,
    /// A box is contained in another when less than this fraction of its
    /// area lies outside.
    pub containment_slack: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            expected_page_count: 2,
            min_area_ratio: 0.1,
            aspect_ratio_range: [1.7, 20.0],
            aspect_ratio_warn_range: None,
            squarishness_min: 0.85,
            squarishness_warn: None,
            direction: PageDirection::Vertical,
            duplicate_iou_threshold: 0.8,
            size_factor_loose: 0.4,
            size_factor_tight: 0.15,
            edge_tolerance_px: 20.0,
            containment_slack: 0.1,
        }
    }
}

/// Thresholds deciding whether split fragments replace a merged page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverPolicy {
    /// Maximum common-intersection over union of the fragment boxes.
    pub max_fragment_overlap: f64,
    /// Minimum IoU between the fragments' union box and the merged page.
    pub min_union_iou: f64,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            max_fragment_overlap: 0.4,
            min_union_iou: 0.9,
        }
    }
}

/// Parameters of the margin-strip trimmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimPolicy {
    pub enabled: bool,
    pub squarishness_min: f64,
    /// Allowed relative height difference between strip and page.
    pub height_tolerance: f64,
    /// Maximum strip width as a fraction of the page width.
    pub max_width_ratio: f64,
    /// Maximum distance between strip and page edge, as a fraction of the
    /// page width.
    pub flush_tolerance: f64,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            squarishness_min: 0.65,
            height_tolerance: 0.1,
            max_width_ratio: 0.1,
            flush_tolerance: 0.05,
        }
    }
}

/// Mask cleanup applied by the geometry builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryOptions {
    /// Side of the square erosion element in working-resolution pixels;
    /// 0 disables erosion.
    pub erosion_kernel: u32,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self { erosion_kernel: 30 }
    }
}

/// How a page rectangle is turned into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Crop the axis-aligned box around the rectangle.
    AxisAligned,
    /// Rotate about the rectangle center and crop it exactly.
    #[default]
    RotationCorrected,
}

/// Color-card calibration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub enabled: bool,
    /// Tag marking a page record as the color-card patch.
    pub patch_tag: String,
    /// sRGB-encoded value the patch should reach after correction.
    pub target_value: f64,
    /// Fraction of the exposure-time ratio applied when reusing a
    /// calibration on another photograph.
    pub exposure_damping: f64,
    /// Gains used until the first patch of a batch is seen.
    pub default_white_balance: [f64; 3],
    pub default_exposure: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patch_tag: "T1".to_owned(),
            target_value: 0.95,
            exposure_damping: 0.5,
            default_white_balance: [1.0; 3],
            default_exposure: 1.0,
        }
    }
}

/// Global page numbering across a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResequenceOptions {
    pub enabled: bool,
    /// Number given to the first exported page; values above 1 leave room
    /// for introductory pages inserted later.
    pub first_number: u32,
}

impl Default for ResequenceOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            first_number: 1,
        }
    }
}

/// Batch driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker count for the parallel passes.
    pub concurrency: usize,
    /// Skip photographs whose pages have all been written already.
    pub skip_if_exists: bool,
    /// Run the selection engine even when a record already lists pages.
    pub reanalyze: bool,
    /// Re-run selection on the denser oracle output when the page count
    /// is off.
    pub dense_retry: bool,
    pub resequence: ResequenceOptions,
    /// Extension (and therefore format) of the written pages.
    pub output_extension: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            skip_if_exists: true,
            reanalyze: false,
            dense_retry: true,
            resequence: ResequenceOptions::default(),
            output_extension: "tif".to_owned(),
        }
    }
}

/// Complete Folio configuration, persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub selection: SelectionPolicy,
    pub resolver: ResolverPolicy,
    pub trim: TrimPolicy,
    pub geometry: GeometryOptions,
    pub extraction: ExtractionMode,
    pub calibration: CalibrationConfig,
    pub batch: BatchConfig,
}

impl FolioConfig {
    /// Read a configuration file; missing fields take their defaults.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject parameter combinations the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.selection;
        if s.expected_page_count == 0 {
            return Err(invalid("expected_page_count must be at least 1"));
        }
        check_range("aspect_ratio_range", s.aspect_ratio_range)?;
        if let Some(range) = s.aspect_ratio_warn_range {
            check_range("aspect_ratio_warn_range", range)?;
        }
        if !(0.0..=1.0).contains(&s.min_area_ratio) {
            return Err(invalid("min_area_ratio must be within [0, 1]"));
        }
        if s.squarishness_warn.is_some_and(|warn| warn < s.squarishness_min) {
            return Err(invalid("squarishness_warn must not be below squarishness_min"));
        }
        if s.size_factor_tight > s.size_factor_loose {
            return Err(invalid("size_factor_tight must not exceed size_factor_loose"));
        }
        if self.calibration.target_value <= 0.0 || self.calibration.target_value > 1.0 {
            return Err(invalid("calibration target_value must be within (0, 1]"));
        }
        if self.calibration.default_white_balance.iter().any(|f| *f <= 0.0)
            || self.calibration.default_exposure <= 0.0
        {
            return Err(invalid("default correction gains must be positive"));
        }
        if self.batch.concurrency == 0 {
            return Err(invalid("batch concurrency must be at least 1"));
        }
        if self.batch.output_extension.is_empty() {
            return Err(invalid("output_extension must not be empty"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> FolioError {
    FolioError::InvalidConfig(msg.to_owned())
}

fn check_range(name: &str, range: [f64; 2]) -> Result<()> {
    if range[0] <= 0.0 || range[0] > range[1] {
        return Err(FolioError::InvalidConfig(format!(
            "{name} must be an increasing pair of positive ratios, got {range:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FolioConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg: FolioConfig =
            serde_json::from_str(r#"{ "selection": { "expected_page_count": 1 } }"#).unwrap();
        assert_eq!(cfg.selection.expected_page_count, 1);
        assert_eq!(cfg.selection.duplicate_iou_threshold, 0.8);
        assert_eq!(cfg.batch.concurrency, 4);
        assert_eq!(cfg.extraction, ExtractionMode::RotationCorrected);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut cfg = FolioConfig::default();
        cfg.selection.aspect_ratio_range = [5.0, 2.0];
        assert!(matches!(cfg.validate(), Err(FolioError::InvalidConfig(_))));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut cfg = FolioConfig::default();
        cfg.batch.concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.config.json");
        let mut cfg = FolioConfig::default();
        cfg.trim.enabled = true;
        cfg.save(&path).unwrap();
        let loaded = FolioConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }
}
