// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-folder metadata document.
//
// One `FolderRecord` describes a batch of photographs: their dimensions,
// pre-rotation, the page rectangles selected for each (possibly corrected by
// a human in a QC tool), and a log of engine runs. The document is stored as
// JSON next to the photographs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SelectionPolicy;
use crate::error::Result;
use crate::geometry::{OrientedRect, Rotation};
use crate::types::{PhotoWarning, Warning};

/// One page (or color-card patch) on a photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(rename = "minAreaRect")]
    pub min_area_rect: OrientedRect,
    #[serde(default)]
    pub warnings: Vec<Warning>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PageRecord {
    pub fn new(min_area_rect: OrientedRect, warnings: Vec<Warning>) -> Self {
        Self {
            min_area_rect,
            warnings,
            tags: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Metadata for one photograph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub img_path: String,
    /// Width after `rotation` has been applied.
    pub width: u32,
    /// Height after `rotation` has been applied.
    pub height: u32,
    #[serde(default)]
    pub rotation: Rotation,
    /// Excluded from all output.
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub pages: Vec<PageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PhotoWarning>,
}

impl PhotoRecord {
    pub fn new(img_path: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            img_path: img_path.into(),
            width,
            height,
            rotation: Rotation::Deg0,
            hidden: false,
            pages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Pages to export, excluding color-card patches.
    pub fn content_pages<'a>(&'a self, patch_tag: &'a str) -> impl Iterator<Item = &'a PageRecord> + 'a {
        self.pages.iter().filter(move |p| !p.has_tag(patch_tag))
    }

    /// Color-card patches tagged on this photograph.
    pub fn color_patches<'a>(&'a self, patch_tag: &'a str) -> impl Iterator<Item = &'a PageRecord> + 'a {
        self.pages.iter().filter(move |p| p.has_tag(patch_tag))
    }

    /// Number of images this photograph produces: one per content page,
    /// or one for the whole photograph when there is none.
    pub fn output_count(&self, patch_tag: &str) -> usize {
        self.content_pages(patch_tag).count().max(1)
    }
}

/// Log entry for one engine run over a folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub version: String,
    pub selection: SelectionPolicy,
}

impl RunRecord {
    pub fn new(selection: SelectionPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            selection,
        }
    }
}

/// Metadata document for a folder of photographs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub folder_path: String,
    /// Set once a human has reviewed every photograph.
    #[serde(default)]
    pub checked: bool,
    /// Page lists are already in reading order; skip automatic ordering.
    #[serde(default)]
    pub pages_order: bool,
    #[serde(default)]
    pub runs: Vec<RunRecord>,
    pub files: Vec<PhotoRecord>,
}

impl FolderRecord {
    pub fn new(folder_path: impl Into<String>, files: Vec<PhotoRecord>) -> Self {
        Self {
            folder_path: folder_path.into(),
            checked: false,
            pages_order: false,
            runs: Vec::new(),
            files,
        }
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
