// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch runner — applies the page pipeline to a folder of photographs in
// three passes:
//
// 1. parallel: validate dimensions, select pages, measure color patches;
// 2. sequential, in folder order: propagate calibration, number pages;
// 3. parallel: extract, correct and write pages.
//
// Workers run on the blocking pool, bounded by a semaphore, and report back
// over a channel. A failing photograph is logged and skipped; only
// non-recoverable errors abort the batch.

use std::sync::Arc;

use folio_core::config::FolioConfig;
use folio_core::error::{FolioError, Result};
use folio_core::{
    ColorCorrection, ExposureInfo, FolderRecord, OrientedRect, PageRecord, PhotoRecord, PhotoWarning, RunRecord,
};
use folio_engine::color::{CalibrationChain, ColorCalibrator, apply_correction};
use folio_engine::select::order_by_reading;
use folio_engine::{PageExtractor, PagePipeline, rotate_quarter};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::naming::{Resequencer, output_name};
use crate::report::{BatchReport, PhotoFailure, PhotoNote};
use crate::source::{AnnotationSource, ArtifactSink, ImageSource};

/// Shared, read-only state handed to every worker.
struct Context {
    config: FolioConfig,
    pipeline: PagePipeline,
    extractor: PageExtractor,
    annotations: Arc<dyn AnnotationSource>,
    images: Arc<dyn ImageSource>,
    sink: Arc<dyn ArtifactSink>,
}

/// Pass 1 result for one photograph.
#[derive(Debug)]
struct Analysed {
    photo: PhotoRecord,
    reanalysed: bool,
    correction: Option<ColorCorrection>,
    exposure: ExposureInfo,
}

#[derive(Debug, Clone)]
struct OutputPage {
    name: String,
    /// `None` exports the whole photograph.
    rect: Option<OrientedRect>,
}

/// Pass 2 result for one photograph.
#[derive(Debug)]
struct ExtractionJob {
    photo: PhotoRecord,
    outputs: Vec<OutputPage>,
    correction: Option<ColorCorrection>,
}

#[derive(Debug)]
enum Extracted {
    Written(usize),
    AlreadyPresent,
}

pub struct BatchRunner {
    ctx: Arc<Context>,
}

impl BatchRunner {
    /// Validates `config` before anything runs.
    pub fn new(
        config: FolioConfig,
        annotations: Arc<dyn AnnotationSource>,
        images: Arc<dyn ImageSource>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Result<Self> {
        config.validate()?;
        let pipeline = PagePipeline::new(config.clone());
        let extractor = PageExtractor::new(config.extraction);
        Ok(Self {
            ctx: Arc::new(Context {
                config,
                pipeline,
                extractor,
                annotations,
                images,
                sink,
            }),
        })
    }

    /// Process every visible photograph of `folder`, updating its records
    /// in place and appending a run entry.
    #[instrument(skip_all, fields(folder = %folder.folder_path, photos = folder.files.len()))]
    pub async fn run(&self, folder: &mut FolderRecord) -> Result<BatchReport> {
        let run = RunRecord::new(self.ctx.config.selection.clone());
        let mut report = BatchReport::new(run.id, folder.files.len());
        info!(run_id = %run.id, "Batch started");

        let visible: Vec<(usize, PhotoRecord)> = folder
            .files
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.hidden)
            .map(|(i, p)| (i, p.clone()))
            .collect();
        report.hidden = folder.files.len() - visible.len();

        // Pass 1
        let keep_order = folder.pages_order;
        let results = self
            .run_parallel(visible, move |ctx, photo| analyse_photo(ctx, photo, keep_order))
            .await?;
        let analysed = settle(results, &mut report)?;
        report.analysed = analysed.iter().filter(|(_, a)| a.reanalysed).count();

        // Pass 2
        let jobs = self.plan(&analysed);
        for (index, a) in analysed {
            for warning in &a.photo.warnings {
                report.warnings.push(PhotoNote {
                    img_path: a.photo.img_path.clone(),
                    warning: warning.clone(),
                });
            }
            folder.files[index] = a.photo;
        }

        // Pass 3
        let results = self.run_parallel(jobs, extract_photo).await?;
        for (_, outcome) in settle(results, &mut report)? {
            match outcome {
                Extracted::Written(n) => report.pages_written += n,
                Extracted::AlreadyPresent => report.skipped_existing += 1,
            }
        }

        folder.runs.push(run);
        report.finished = Some(chrono::Utc::now());
        info!(
            pages = report.pages_written,
            skipped = report.skipped_existing,
            failures = report.failures.len(),
            "Batch finished"
        );
        Ok(report)
    }

    /// Sequential pass: calibration propagation and page numbering, in
    /// folder order.
    fn plan(&self, analysed: &[(usize, Analysed)]) -> Vec<(usize, ExtractionJob)> {
        let config = &self.ctx.config;
        let tag = config.calibration.patch_tag.as_str();
        let calibrator = ColorCalibrator::new(&config.calibration);
        let mut chain = CalibrationChain::new(
            calibrator.default_correction(),
            config.calibration.exposure_damping,
        );
        let mut numbers = Resequencer::new(&config.batch.resequence);

        analysed
            .iter()
            .map(|(index, a)| {
                let correction = if !config.calibration.enabled {
                    None
                } else if let Some(own) = &a.correction {
                    chain.record(own.clone());
                    Some(own.clone())
                } else {
                    Some(chain.correction_for(&a.exposure))
                };

                let mut rects: Vec<Option<OrientedRect>> =
                    a.photo.content_pages(tag).map(|p| Some(p.min_area_rect)).collect();
                if rects.is_empty() {
                    rects.push(None);
                }
                let sequence = numbers.assign(rects.len());
                let outputs = rects
                    .into_iter()
                    .zip(sequence)
                    .enumerate()
                    .map(|(i, (rect, seq))| OutputPage {
                        name: output_name(&a.photo.img_path, i + 1, seq, &config.batch.output_extension),
                        rect,
                    })
                    .collect();
                debug!(
                    img_path = %a.photo.img_path,
                    origin = ?correction.as_ref().and_then(|c| c.origin.as_deref()),
                    "Photograph planned"
                );
                (
                    *index,
                    ExtractionJob {
                        photo: a.photo.clone(),
                        outputs,
                        correction,
                    },
                )
            })
            .collect()
    }

    /// Run `work` on the blocking pool for every item, at most
    /// `concurrency` at a time. Results come back sorted by index.
    async fn run_parallel<I, T, F>(&self, items: Vec<(usize, I)>, work: F) -> Result<Vec<(usize, String, Result<T>)>>
    where
        I: Labelled + Send + 'static,
        T: Send + 'static,
        F: Fn(&Context, I) -> Result<T> + Send + Sync + 'static,
    {
        let work = Arc::new(work);
        let semaphore = Arc::new(Semaphore::new(self.ctx.config.batch.concurrency));
        let (tx, mut rx) = mpsc::channel(items.len().max(1));

        for (index, item) in items {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| FolioError::TaskJoin(e.to_string()))?;
            let tx = tx.clone();
            let ctx = Arc::clone(&self.ctx);
            let work = Arc::clone(&work);
            let label = item.label().to_owned();
            tokio::spawn(async move {
                let joined = tokio::task::spawn_blocking(move || (*work)(ctx.as_ref(), item)).await;
                drop(permit);
                let result = joined.unwrap_or_else(|e| Err(FolioError::WorkerPanicked(e.to_string())));
                if tx.send((index, label, result)).await.is_err() {
                    warn!(index, "Result receiver dropped");
                }
            });
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(r) = rx.recv().await {
            results.push(r);
        }
        results.sort_by_key(|(i, _, _)| *i);
        Ok(results)
    }
}

/// Names a work item in logs and failure reports.
trait Labelled {
    fn label(&self) -> &str;
}

impl Labelled for PhotoRecord {
    fn label(&self) -> &str {
        &self.img_path
    }
}

impl Labelled for ExtractionJob {
    fn label(&self) -> &str {
        &self.photo.img_path
    }
}

/// Split worker results into successes and logged failures. A
/// non-recoverable error aborts the batch.
fn settle<T>(results: Vec<(usize, String, Result<T>)>, report: &mut BatchReport) -> Result<Vec<(usize, T)>> {
    let mut ok = Vec::with_capacity(results.len());
    for (index, label, result) in results {
        match result {
            Ok(v) => ok.push((index, v)),
            Err(err) if err.is_recoverable() => {
                error!(img_path = %label, %err, "Photograph skipped");
                report.failures.push(PhotoFailure {
                    img_path: label,
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    Ok(ok)
}

/// Pass 1 worker.
fn analyse_photo(ctx: &Context, mut photo: PhotoRecord, keep_order: bool) -> Result<Analysed> {
    let config = &ctx.config;
    let tag = config.calibration.patch_tag.clone();

    let probe = ctx
        .images
        .probe(&photo)?
        .ok_or_else(|| FolioError::MissingImage(photo.img_path.clone()))?;
    let (width, height) = photo.rotation.rotated_dims(probe.width, probe.height);
    check_dims(&photo, width, height)?;

    let reanalysed = photo.content_pages(&tag).next().is_none() || config.batch.reanalyze;
    if reanalysed {
        let oracle = ctx
            .annotations
            .load(&photo)?
            .ok_or_else(|| FolioError::MissingAnnotations(photo.img_path.clone()))?;
        let mut analysis = ctx.pipeline.analyze(&oracle, photo.rotation, width, height);
        let expected = config.selection.expected_page_count;
        if config.batch.dense_retry && analysis.pages.len() != expected {
            if let Some(dense) = ctx.annotations.load_dense(&photo)? {
                let retry = ctx.pipeline.analyze(&dense, photo.rotation, width, height);
                if retry.pages.len().abs_diff(expected) <= analysis.pages.len().abs_diff(expected) {
                    info!(
                        img_path = %photo.img_path,
                        found = analysis.pages.len(),
                        dense = retry.pages.len(),
                        "Using dense oracle output"
                    );
                    analysis = retry;
                }
            }
        }
        let patches: Vec<PageRecord> = photo.color_patches(&tag).cloned().collect();
        photo.pages = analysis.page_records();
        photo.pages.extend(patches);
        photo.warnings = analysis.warnings;
    } else if !keep_order {
        order_pages(&mut photo, &tag);
    }

    let mut correction = None;
    photo
        .warnings
        .retain(|w| !matches!(w, PhotoWarning::CalibrationSkipped { .. }));
    if config.calibration.enabled {
        let patch_bbox = photo
            .color_patches(&tag)
            .next()
            .map(|patch| patch.min_area_rect.bounding_box(width, height));
        if let Some(bbox) = patch_bbox {
            let loaded = ctx
                .images
                .load(&photo)?
                .ok_or_else(|| FolioError::MissingImage(photo.img_path.clone()))?;
            let image = rotate_quarter(loaded.image, photo.rotation);
            let calibrator = ColorCalibrator::new(&config.calibration);
            match calibrator.calibrate(&image, &bbox, probe.exposure, Some(photo.img_path.clone())) {
                Ok(c) => correction = Some(c),
                Err(err) => {
                    warn!(img_path = %photo.img_path, %err, "Color patch not usable, keeping previous correction");
                    photo.warnings.push(PhotoWarning::CalibrationSkipped {
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    Ok(Analysed {
        photo,
        reanalysed,
        correction,
        exposure: probe.exposure,
    })
}

/// Put content pages in reading order, color patches last.
fn order_pages(photo: &mut PhotoRecord, tag: &str) {
    let (mut content, patches): (Vec<PageRecord>, Vec<PageRecord>) =
        photo.pages.drain(..).partition(|p| !p.has_tag(tag));
    order_by_reading(&mut content, |p| p.min_area_rect.center);
    photo.pages = content;
    photo.pages.extend(patches);
}

/// Pass 3 worker.
fn extract_photo(ctx: &Context, job: ExtractionJob) -> Result<Extracted> {
    if ctx.config.batch.skip_if_exists && job.outputs.iter().all(|o| ctx.sink.exists(&o.name)) {
        debug!(img_path = %job.photo.img_path, "All pages present, skipping");
        return Ok(Extracted::AlreadyPresent);
    }

    let loaded = ctx
        .images
        .load(&job.photo)?
        .ok_or_else(|| FolioError::MissingImage(job.photo.img_path.clone()))?;
    let image = rotate_quarter(loaded.image, job.photo.rotation);
    check_dims(&job.photo, image.width(), image.height())?;

    for out in &job.outputs {
        let page = match &out.rect {
            Some(rect) => ctx.extractor.extract(&image, rect, loaded.bilevel)?,
            None => image.clone(),
        };
        let page = match &job.correction {
            Some(c) if !loaded.bilevel => apply_correction(page, c),
            _ => page,
        };
        ctx.sink.write(&out.name, &page)?;
        debug!(name = %out.name, "Page written");
    }
    Ok(Extracted::Written(job.outputs.len()))
}

fn check_dims(photo: &PhotoRecord, width: u32, height: u32) -> Result<()> {
    if (width, height) != (photo.width, photo.height) {
        return Err(FolioError::DimensionMismatch {
            path: photo.img_path.clone(),
            expected_width: photo.width,
            expected_height: photo.height,
            actual_width: width,
            actual_height: height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::source::{ImageProbe, LoadedImage};
    use folio_core::config::ResequenceOptions;
    use folio_core::{CropWindow, Point2, Rotation};
    use folio_engine::{OracleMask, OracleOutput};
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

    #[derive(Default)]
    struct MemoryImages {
        images: HashMap<String, (DynamicImage, ExposureInfo)>,
        loads: Mutex<usize>,
    }

    impl ImageSource for MemoryImages {
        fn probe(&self, photo: &PhotoRecord) -> Result<Option<ImageProbe>> {
            Ok(self.images.get(&photo.img_path).map(|(img, exposure)| ImageProbe {
                width: img.width(),
                height: img.height(),
                exposure: *exposure,
            }))
        }

        fn load(&self, photo: &PhotoRecord) -> Result<Option<LoadedImage>> {
            *self.loads.lock().unwrap() += 1;
            Ok(self.images.get(&photo.img_path).map(|(img, exposure)| LoadedImage {
                image: img.clone(),
                exposure: *exposure,
                bilevel: false,
            }))
        }
    }

    #[derive(Default)]
    struct MemoryAnnotations {
        outputs: HashMap<String, OracleOutput>,
        dense: HashMap<String, OracleOutput>,
    }

    impl AnnotationSource for MemoryAnnotations {
        fn load(&self, photo: &PhotoRecord) -> Result<Option<OracleOutput>> {
            Ok(self.outputs.get(&photo.img_path).cloned())
        }

        fn load_dense(&self, photo: &PhotoRecord) -> Result<Option<OracleOutput>> {
            Ok(self.dense.get(&photo.img_path).cloned())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        written: Mutex<HashMap<String, DynamicImage>>,
        /// Writing this name panics.
        panic_on: Option<String>,
    }

    impl ArtifactSink for MemorySink {
        fn exists(&self, name: &str) -> bool {
            self.written.lock().unwrap().contains_key(name)
        }

        fn write(&self, name: &str, image: &DynamicImage) -> Result<()> {
            if self.panic_on.as_deref() == Some(name) {
                panic!("encoder crashed on {name}");
            }
            self.written.lock().unwrap().insert(name.to_owned(), image.clone());
            Ok(())
        }
    }

    /// 800 x 600 photograph: two stacked light pages on a dark background.
    fn spread() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(800, 600, |x, y| {
            let in_page = (100..700).contains(&x) && ((50..250).contains(&y) || (320..520).contains(&y));
            if in_page { Rgb([200, 190, 170]) } else { Rgb([30, 30, 30]) }
        }))
    }

    /// Half-resolution mask of rows `y0..y1` of [`spread`].
    fn page_mask(y0: u32, y1: u32) -> OracleMask {
        let img = GrayImage::from_fn(400, 300, |x, y| {
            if (50..350).contains(&x) && (y0..y1).contains(&y) { Luma([255u8]) } else { Luma([0u8]) }
        });
        OracleMask::new(img, CropWindow::new(0.0, 0.0, 400.0, 300.0))
    }

    /// Masks of the two pages of [`spread`].
    fn spread_masks() -> OracleOutput {
        OracleOutput::new(vec![page_mask(160, 260), page_mask(25, 125)])
    }

    struct Fixture {
        images: Arc<MemoryImages>,
        sink: Arc<MemorySink>,
        folder: FolderRecord,
        annotations: Arc<MemoryAnnotations>,
    }

    fn fixture(names: &[&str]) -> Fixture {
        fixture_with(names, spread())
    }

    fn fixture_with(names: &[&str], image: DynamicImage) -> Fixture {
        let mut images = MemoryImages::default();
        let mut annotations = MemoryAnnotations::default();
        let mut files = Vec::new();
        for name in names {
            images.images.insert((*name).to_owned(), (image.clone(), ExposureInfo::default()));
            annotations.outputs.insert((*name).to_owned(), spread_masks());
            files.push(PhotoRecord::new(*name, 800, 600));
        }
        Fixture {
            images: Arc::new(images),
            sink: Arc::new(MemorySink::default()),
            folder: FolderRecord::new("batch", files),
            annotations: Arc::new(annotations),
        }
    }

    fn config() -> FolioConfig {
        let mut config = FolioConfig::default();
        config.geometry.erosion_kernel = 4;
        config.batch.concurrency = 2;
        config
    }

    fn runner(f: &Fixture, config: FolioConfig) -> BatchRunner {
        BatchRunner::new(config, f.annotations.clone(), f.images.clone(), f.sink.clone()).unwrap()
    }

    fn names(sink: &MemorySink) -> Vec<String> {
        let mut v: Vec<String> = sink.written.lock().unwrap().keys().cloned().collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn extracts_pages_of_every_photo() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.analysed, 2);
        assert_eq!(report.pages_written, 4);
        assert_eq!(names(&f.sink), vec!["p1a.tif", "p1b.tif", "p2a.tif", "p2b.tif"]);
        assert_eq!(f.folder.files[0].pages.len(), 2);
        assert_eq!(f.folder.runs.len(), 1);

        // Top page first, 600 x 200.
        let written = f.sink.written.lock().unwrap();
        let a = &written["p1a.tif"];
        assert!((a.width() as i32 - 600).abs() <= 8);
        assert!((a.height() as i32 - 200).abs() <= 8);
        assert!(f.folder.files[0].pages[0].min_area_rect.center.y < 200.0);
    }

    #[tokio::test]
    async fn resequencing_numbers_across_photos() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        let mut cfg = config();
        cfg.batch.resequence = ResequenceOptions {
            enabled: true,
            first_number: 3,
        };
        runner(&f, cfg).run(&mut f.folder).await.unwrap();
        assert_eq!(
            names(&f.sink),
            vec!["0003_p1a.tif", "0004_p1b.tif", "0005_p2a.tif", "0006_p2b.tif"]
        );
    }

    #[tokio::test]
    async fn second_run_skips_existing_pages() {
        let mut f = fixture(&["p1.jpg"]);
        let r = runner(&f, config());
        r.run(&mut f.folder).await.unwrap();
        let loads_after_first = *f.images.loads.lock().unwrap();
        let report = r.run(&mut f.folder).await.unwrap();
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.pages_written, 0);
        // Pages come from the record now; nothing is reanalysed or reloaded.
        assert_eq!(report.analysed, 0);
        assert_eq!(*f.images.loads.lock().unwrap(), loads_after_first);
        assert_eq!(f.folder.runs.len(), 2);
    }

    #[tokio::test]
    async fn failing_photo_does_not_stop_the_batch() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        f.folder.files.push(PhotoRecord::new("missing.jpg", 800, 600));
        f.folder.files[1].width = 640;
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].img_path, "p2.jpg");
        assert_eq!(report.failures[1].img_path, "missing.jpg");
        assert_eq!(names(&f.sink), vec!["p1a.tif", "p1b.tif"]);
    }

    #[tokio::test]
    async fn hidden_photos_are_not_exported() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        f.folder.files[0].hidden = true;
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(report.hidden, 1);
        assert_eq!(names(&f.sink), vec!["p2a.tif", "p2b.tif"]);
    }

    #[tokio::test]
    async fn photo_without_pages_is_exported_whole() {
        let mut f = fixture(&["p1.jpg"]);
        let annotations = Arc::new(MemoryAnnotations {
            outputs: HashMap::from([("p1.jpg".to_owned(), OracleOutput::default())]),
            ..Default::default()
        });
        f.annotations = annotations;
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(names(&f.sink), vec!["p1a.tif"]);
        let written = f.sink.written.lock().unwrap();
        assert_eq!(written["p1a.tif"].width(), 800);
        assert!(report.warnings.iter().any(|n| n.warning == PhotoWarning::WholeImageFallback));
    }

    #[tokio::test]
    async fn color_patch_calibrates_following_photos() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        // Patch over the top page of the first photograph.
        let mut patch = PageRecord::new(
            OrientedRect::new(Point2::new(400.0, 150.0), 100.0, 60.0, 0.0),
            Vec::new(),
        );
        patch.tags.push("T1".to_owned());
        f.folder.files[0].pages.push(patch);

        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert!(report.is_clean());
        // The patch is not exported as a page.
        assert_eq!(names(&f.sink).len(), 4);
        assert_eq!(f.folder.files[0].color_patches("T1").count(), 1);

        // Page color becomes neutral in both photographs.
        let written = f.sink.written.lock().unwrap();
        for name in ["p1a.tif", "p2a.tif"] {
            let px = written[name].to_rgb8().get_pixel(100, 100).0;
            assert!((px[0] as i32 - px[2] as i32).abs() <= 2, "{name}: {px:?}");
            assert!((px[0] as i32 - 242).abs() <= 2, "{name}: {px:?}");
        }
    }

    #[tokio::test]
    async fn recorded_pages_are_reordered_unless_pinned() {
        let mut f = fixture(&["p1.jpg"]);
        let bottom = PageRecord::new(OrientedRect::new(Point2::new(400.0, 420.0), 600.0, 200.0, 0.0), Vec::new());
        let top = PageRecord::new(OrientedRect::new(Point2::new(400.0, 150.0), 600.0, 200.0, 0.0), Vec::new());
        f.folder.files[0].pages = vec![bottom.clone(), top.clone()];

        runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(f.folder.files[0].pages, vec![top.clone(), bottom.clone()]);

        let mut g = fixture(&["p1.jpg"]);
        g.folder.pages_order = true;
        g.folder.files[0].pages = vec![bottom.clone(), top.clone()];
        runner(&g, config()).run(&mut g.folder).await.unwrap();
        assert_eq!(g.folder.files[0].pages, vec![bottom, top]);
    }

    #[tokio::test]
    async fn rotated_photo_uses_rotated_dimensions() {
        let mut f = fixture(&["p1.jpg"]);
        f.folder.files[0].rotation = Rotation::Deg180;
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.pages_written, 2);
    }

    #[tokio::test]
    async fn panicking_worker_only_skips_its_photograph() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        f.sink = Arc::new(MemorySink {
            panic_on: Some("p1a.tif".to_owned()),
            ..Default::default()
        });
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].img_path, "p1.jpg");
        assert!(report.failures[0].error.contains("panicked"), "{}", report.failures[0].error);
        assert_eq!(names(&f.sink), vec!["p2a.tif", "p2b.tif"]);
        assert_eq!(f.folder.runs.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_page_record_only_skips_its_photograph() {
        let mut f = fixture(&["p1.jpg", "p2.jpg"]);
        f.folder.files[0].pages = vec![PageRecord::new(
            OrientedRect::new(Point2::new(400.0, 300.0), 5e9, 5e9, 10.0),
            Vec::new(),
        )];
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].img_path, "p1.jpg");
        assert_eq!(names(&f.sink), vec!["p2a.tif", "p2b.tif"]);
    }

    #[tokio::test]
    async fn unusable_color_patch_keeps_the_photograph() {
        // Black corner under the patch.
        let mut image = spread().to_rgb8();
        for y in 0..40 {
            for x in 0..60 {
                image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        let mut f = fixture_with(&["p1.jpg"], DynamicImage::ImageRgb8(image));
        let mut patch = PageRecord::new(OrientedRect::new(Point2::new(30.0, 20.0), 40.0, 30.0, 0.0), Vec::new());
        patch.tags.push("T1".to_owned());
        f.folder.files[0].pages.push(patch);

        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(names(&f.sink), vec!["p1a.tif", "p1b.tif"]);
        assert!(report
            .warnings
            .iter()
            .any(|n| matches!(n.warning, PhotoWarning::CalibrationSkipped { .. })));

        // Default correction leaves the page color alone.
        let written = f.sink.written.lock().unwrap();
        let px = written["p1a.tif"].to_rgb8().get_pixel(100, 100).0;
        assert_eq!(px, [200, 190, 170]);
    }

    #[tokio::test]
    async fn dense_output_recovers_missing_page() {
        let mut f = fixture(&["p1.jpg"]);
        f.annotations = Arc::new(MemoryAnnotations {
            outputs: HashMap::from([("p1.jpg".to_owned(), OracleOutput::new(vec![page_mask(25, 125)]))]),
            dense: HashMap::from([("p1.jpg".to_owned(), spread_masks())]),
        });
        let report = runner(&f, config()).run(&mut f.folder).await.unwrap();
        assert!(report.is_clean());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(names(&f.sink), vec!["p1a.tif", "p1b.tif"]);

        let mut g = fixture(&["p1.jpg"]);
        g.annotations = f.annotations.clone();
        let mut cfg = config();
        cfg.batch.dense_retry = false;
        let report = runner(&g, cfg).run(&mut g.folder).await.unwrap();
        assert_eq!(names(&g.sink), vec!["p1a.tif"]);
        assert!(report
            .warnings
            .iter()
            .any(|n| n.warning == PhotoWarning::PageCount { found: 1, expected: 2 }));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let f = fixture(&[]);
        let mut cfg = config();
        cfg.batch.concurrency = 0;
        let err = BatchRunner::new(cfg, f.annotations.clone(), f.images.clone(), f.sink.clone()).err();
        assert!(matches!(err, Some(FolioError::InvalidConfig(_))));
    }
}
