// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local directory store — photographs, oracle output and extracted pages on
// disk.
//
// Layout under the photograph root:
//
//   folio.json                  folder metadata document
//   <img_path>                  source photograph
//   <img_path>.masks.json       oracle manifest, masks stored as PNG files
//   <img_path>.masks.dense.json optional manifest of a denser oracle pass
//   <img_path>.exif.json        optional exposure sidecar
//
// Pages are written under a separate output directory, keeping the
// photographs' relative directories.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_core::{CropWindow, ExposureInfo, FolderRecord, PhotoRecord};
use folio_engine::{OracleMask, OracleOutput};
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::source::{AnnotationSource, ArtifactSink, ImageProbe, ImageSource, LoadedImage};

const RECORD_FILE: &str = "folio.json";
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

/// Manifest suffix and mask file infix of one oracle pass.
#[derive(Debug, Clone, Copy)]
struct MaskSet {
    manifest: &'static str,
    mask: &'static str,
}

const COARSE: MaskSet = MaskSet {
    manifest: "masks.json",
    mask: "mask",
};
const DENSE: MaskSet = MaskSet {
    manifest: "masks.dense.json",
    mask: "mask-dense",
};

/// On-disk form of one oracle mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaskEntry {
    /// PNG file, relative to the manifest.
    file: String,
    /// `[left, top, right, bottom]` in working-resolution pixels.
    crop_box: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MaskManifest {
    masks: Vec<MaskEntry>,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    output: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: output.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn record_path(&self) -> PathBuf {
        self.root.join(RECORD_FILE)
    }

    /// Build a fresh folder record from the photographs under the root.
    ///
    /// Files are listed recursively and sorted by relative path. Files that
    /// cannot be probed are left out with a warning.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn scan(&self) -> Result<FolderRecord> {
        let mut paths = Vec::new();
        collect_images(&self.root, &self.output, &mut paths)?;
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(rel) = self.relative(&path) else { continue };
            match image::image_dimensions(&path) {
                Ok((width, height)) => files.push(PhotoRecord::new(rel, width, height)),
                Err(err) => warn!(path = %path.display(), %err, "Unreadable photograph left out"),
            }
        }
        info!(photos = files.len(), "Folder scanned");
        Ok(FolderRecord::new(self.root.to_string_lossy(), files))
    }

    /// The stored folder record, or a fresh scan when there is none.
    pub fn load_or_scan(&self) -> Result<FolderRecord> {
        let path = self.record_path();
        if path.exists() {
            debug!(path = %path.display(), "Loading folder record");
            FolderRecord::load(&path)
        } else {
            self.scan()
        }
    }

    pub fn save_record(&self, folder: &FolderRecord) -> Result<()> {
        folder.save(self.record_path())
    }

    /// Store oracle output for `img_path` next to the photograph.
    pub fn store_annotations(&self, img_path: &str, output: &OracleOutput) -> Result<()> {
        self.store_masks(img_path, output, COARSE)
    }

    /// Store the output of the denser oracle pass for `img_path`.
    pub fn store_dense_annotations(&self, img_path: &str, output: &OracleOutput) -> Result<()> {
        self.store_masks(img_path, output, DENSE)
    }

    fn store_masks(&self, img_path: &str, output: &OracleOutput, set: MaskSet) -> Result<()> {
        let manifest_path = self.root.join(format!("{img_path}.{}", set.manifest));
        let dir = manifest_path.parent().unwrap_or(self.root.as_path()).to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let stem = Path::new(img_path)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| img_path.to_owned());

        let mut manifest = MaskManifest::default();
        for (i, m) in output.masks.iter().enumerate() {
            let file = format!("{stem}.{}{i:02}.png", set.mask);
            m.mask
                .save(dir.join(&file))
                .map_err(|e| FolioError::ImageError(format!("failed to save mask {file}: {e}")))?;
            let w = &m.crop_window;
            manifest.masks.push(MaskEntry {
                file,
                crop_box: [w.left, w.top, w.right, w.bottom],
                area: m.area,
            });
        }
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        debug!(path = %manifest_path.display(), masks = manifest.masks.len(), "Annotations stored");
        Ok(())
    }

    /// Store an exposure sidecar for `img_path`.
    pub fn store_exposure(&self, img_path: &str, exposure: &ExposureInfo) -> Result<()> {
        let path = self.root.join(format!("{img_path}.exif.json"));
        std::fs::write(path, serde_json::to_string_pretty(exposure)?)?;
        Ok(())
    }

    fn load_masks(&self, photo: &PhotoRecord, set: MaskSet) -> Result<Option<OracleOutput>> {
        let path = self.root.join(format!("{}.{}", photo.img_path, set.manifest));
        if !path.exists() {
            return Ok(None);
        }
        let manifest: MaskManifest = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let dir = path.parent().unwrap_or(self.root.as_path());

        let mut masks = Vec::with_capacity(manifest.masks.len());
        for entry in manifest.masks {
            let mask = image::open(dir.join(&entry.file))
                .map_err(|e| FolioError::ImageError(format!("failed to open mask {}: {e}", entry.file)))?
                .to_luma8();
            masks.push(OracleMask {
                mask,
                crop_window: CropWindow::from(entry.crop_box),
                area: entry.area,
            });
        }
        Ok(Some(OracleOutput::new(masks)))
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }

    fn exposure(&self, photo: &PhotoRecord) -> Result<ExposureInfo> {
        let path = self.root.join(format!("{}.exif.json", photo.img_path));
        if !path.exists() {
            return Ok(ExposureInfo::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn collect_images(dir: &Path, skip: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if path != skip {
                collect_images(&path, skip, out)?;
            }
            continue;
        }
        let is_image = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        // Mask PNGs live next to the photographs.
        let is_mask = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().contains(".mask"));
        if is_image && !is_mask {
            out.push(path);
        }
    }
    Ok(())
}

/// Decode a photograph. The flag is set when the file stores one bit per
/// pixel.
fn decode(path: &Path) -> image::ImageResult<(DynamicImage, bool)> {
    let decoder = ImageReader::open(path)?.with_guessed_format()?.into_decoder()?;
    let bilevel = decoder.original_color_type() == ExtendedColorType::L1;
    Ok((DynamicImage::from_decoder(decoder)?, bilevel))
}

impl AnnotationSource for LocalStore {
    fn load(&self, photo: &PhotoRecord) -> Result<Option<OracleOutput>> {
        self.load_masks(photo, COARSE)
    }

    fn load_dense(&self, photo: &PhotoRecord) -> Result<Option<OracleOutput>> {
        self.load_masks(photo, DENSE)
    }
}

impl ImageSource for LocalStore {
    fn probe(&self, photo: &PhotoRecord) -> Result<Option<ImageProbe>> {
        let path = self.root.join(&photo.img_path);
        match image::image_dimensions(&path) {
            Ok((width, height)) => Ok(Some(ImageProbe {
                width,
                height,
                exposure: self.exposure(photo)?,
            })),
            Err(err) => {
                warn!(path = %path.display(), %err, "Photograph cannot be probed");
                Ok(None)
            }
        }
    }

    #[instrument(skip_all, fields(img_path = %photo.img_path))]
    fn load(&self, photo: &PhotoRecord) -> Result<Option<LoadedImage>> {
        let path = self.root.join(&photo.img_path);
        let (image, bilevel) = match decode(&path) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(path = %path.display(), %err, "Photograph cannot be decoded");
                return Ok(None);
            }
        };
        debug!(width = image.width(), height = image.height(), bilevel, "Photograph loaded");
        Ok(Some(LoadedImage {
            image,
            exposure: self.exposure(photo)?,
            bilevel,
        }))
    }
}

impl ArtifactSink for LocalStore {
    fn exists(&self, name: &str) -> bool {
        self.output.join(name).exists()
    }

    fn write(&self, name: &str, image: &DynamicImage) -> Result<()> {
        let path = self.output.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image.save(&path).map_err(|err| {
            FolioError::ImageError(format!("failed to save image to {}: {err}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("photos"), dir.path().join("out"));
        std::fs::create_dir_all(store.root().join("vol1")).unwrap();
        (dir, store)
    }

    fn photo(store: &LocalStore, rel: &str, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([120, 110, 100]))
            .save(store.root().join(rel))
            .unwrap();
    }

    #[test]
    fn scan_lists_photographs_in_order() {
        let (_dir, store) = store();
        photo(&store, "vol1/002.png", 30, 20);
        photo(&store, "vol1/001.png", 40, 20);
        std::fs::write(store.root().join("vol1/notes.txt"), "x").unwrap();
        std::fs::write(store.root().join("vol1/broken.jpg"), "not a jpeg").unwrap();

        let folder = store.scan().unwrap();
        let paths: Vec<&str> = folder.files.iter().map(|f| f.img_path.as_str()).collect();
        assert_eq!(paths, vec!["vol1/001.png", "vol1/002.png"]);
        assert_eq!((folder.files[0].width, folder.files[0].height), (40, 20));
    }

    #[test]
    fn annotations_survive_the_disk() {
        let (_dir, store) = store();
        photo(&store, "vol1/001.png", 40, 20);
        let mask = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([255]) } else { Luma([0]) });
        let mut m = OracleMask::new(mask, CropWindow::new(0.0, 0.0, 20.0, 10.0));
        m.area = Some(100);
        store
            .store_annotations("vol1/001.png", &OracleOutput::new(vec![m]))
            .unwrap();

        let record = PhotoRecord::new("vol1/001.png", 40, 20);
        let out = AnnotationSource::load(&store, &record).unwrap().unwrap();
        assert_eq!(out.masks.len(), 1);
        assert_eq!(out.masks[0].area, Some(100));
        assert_eq!(out.masks[0].mask.get_pixel(2, 2).0[0], 255);
        assert_eq!(out.masks[0].crop_window.right, 20.0);

        // Mask files are not photographs.
        assert_eq!(store.scan().unwrap().files.len(), 1);
    }

    #[test]
    fn missing_inputs_are_none() {
        let (_dir, store) = store();
        let record = PhotoRecord::new("vol1/none.png", 10, 10);
        assert!(AnnotationSource::load(&store, &record).unwrap().is_none());
        assert!(ImageSource::load(&store, &record).unwrap().is_none());
        assert!(store.probe(&record).unwrap().is_none());
    }

    #[test]
    fn exposure_sidecar_is_read() {
        let (_dir, store) = store();
        photo(&store, "vol1/001.png", 10, 10);
        let exif = ExposureInfo {
            exposure_time: Some(0.125),
            iso: Some(200),
            aperture: None,
        };
        store.store_exposure("vol1/001.png", &exif).unwrap();
        let probe = store
            .probe(&PhotoRecord::new("vol1/001.png", 10, 10))
            .unwrap()
            .unwrap();
        assert_eq!(probe.exposure, exif);
    }

    /// 8 x 8 one-bit grayscale PNG, alternating black and white columns.
    const ONE_BIT_PNG: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00,
        0x00, 0x08, 0x00, 0x00, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00, 0xec, 0x74, 0x83, 0x26, 0x00, 0x00, 0x00,
        0x0c, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x08, 0x65, 0x40, 0x81, 0x00, 0x15, 0x50, 0x02, 0xa9, 0x9b,
        0xa9, 0x50, 0x59, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn bilevel_sources_are_detected() {
        let (_dir, store) = store();
        std::fs::write(store.root().join("vol1/bw.png"), ONE_BIT_PNG).unwrap();
        photo(&store, "vol1/color.png", 8, 8);
        let bw = ImageSource::load(&store, &PhotoRecord::new("vol1/bw.png", 8, 8))
            .unwrap()
            .unwrap();
        let color = ImageSource::load(&store, &PhotoRecord::new("vol1/color.png", 8, 8))
            .unwrap()
            .unwrap();
        assert!(bw.bilevel);
        assert_eq!(bw.image.to_luma8().get_pixel(0, 0).0[0], 0);
        assert_eq!(bw.image.to_luma8().get_pixel(1, 0).0[0], 255);
        assert!(!color.bilevel);
    }

    #[test]
    fn blank_grayscale_page_is_not_bilevel() {
        let (_dir, store) = store();
        GrayImage::from_pixel(8, 8, Luma([255]))
            .save(store.root().join("vol1/blank.png"))
            .unwrap();
        GrayImage::from_fn(8, 8, |x, _| if x % 2 == 0 { Luma([0]) } else { Luma([255]) })
            .save(store.root().join("vol1/stripes.png"))
            .unwrap();
        for name in ["vol1/blank.png", "vol1/stripes.png"] {
            let loaded = ImageSource::load(&store, &PhotoRecord::new(name, 8, 8))
                .unwrap()
                .unwrap();
            assert!(!loaded.bilevel, "{name}");
        }
    }

    #[test]
    fn dense_annotations_are_kept_apart() {
        let (_dir, store) = store();
        photo(&store, "vol1/001.png", 40, 20);
        let mask = |w: u32| {
            let img = GrayImage::from_fn(20, 10, move |x, _| if x < w { Luma([255]) } else { Luma([0]) });
            OracleMask::new(img, CropWindow::new(0.0, 0.0, 20.0, 10.0))
        };
        let record = PhotoRecord::new("vol1/001.png", 40, 20);
        assert!(store.load_dense(&record).unwrap().is_none());

        store
            .store_annotations("vol1/001.png", &OracleOutput::new(vec![mask(10)]))
            .unwrap();
        store
            .store_dense_annotations("vol1/001.png", &OracleOutput::new(vec![mask(5), mask(15)]))
            .unwrap();

        let coarse = AnnotationSource::load(&store, &record).unwrap().unwrap();
        let dense = store.load_dense(&record).unwrap().unwrap();
        assert_eq!(coarse.masks.len(), 1);
        assert_eq!(dense.masks.len(), 2);
        assert_eq!(dense.masks[1].mask.get_pixel(12, 2).0[0], 255);
        assert!(store.root().join("vol1/001.png.mask-dense01.png").is_file());
        assert_eq!(store.scan().unwrap().files.len(), 1);
    }

    #[test]
    fn sink_creates_directories() {
        let (_dir, store) = store();
        let page = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(!store.exists("vol1/001a.tif"));
        store.write("vol1/001a.tif", &page).unwrap();
        assert!(store.exists("vol1/001a.tif"));
        assert!(store.output().join("vol1/001a.tif").is_file());
    }

    #[test]
    fn record_is_reloaded_after_save() {
        let (_dir, store) = store();
        photo(&store, "vol1/001.png", 10, 10);
        let mut folder = store.load_or_scan().unwrap();
        folder.checked = true;
        store.save_record(&folder).unwrap();
        let again = store.load_or_scan().unwrap();
        assert!(again.checked);
        assert_eq!(again.files.len(), 1);
    }
}
