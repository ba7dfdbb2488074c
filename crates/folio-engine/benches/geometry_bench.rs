// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for folio-engine: mask-to-annotation geometry and the
// full per-photograph selection pipeline on synthetic masks.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma};

use folio_core::config::{FolioConfig, GeometryOptions};
use folio_core::{CropWindow, Rotation};
use folio_engine::{GeometryBuilder, OracleMask, OracleOutput, PagePipeline};

/// 400x300 working-resolution mask with a slightly tilted page blob.
fn tilted_mask(y_offset: u32) -> OracleMask {
    let img = GrayImage::from_fn(400, 300, |x, y| {
        let skew = x / 20;
        if x > 40 && x < 360 && y > y_offset + skew && y < y_offset + 100 + skew {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    OracleMask::new(img, CropWindow::new(0.0, 0.0, 400.0, 300.0))
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// One mask upsampled 4x to a 1600x1200 photograph.
fn bench_geometry_builder(c: &mut Criterion) {
    let mask = tilted_mask(20);
    let builder = GeometryBuilder::new(GeometryOptions::default());

    c.bench_function("geometry_builder (400x300 -> 1600x1200)", |b| {
        b.iter(|| {
            let annotation = builder.build(black_box(&mask), Rotation::Deg0, 1600, 1200);
            black_box(annotation.ok());
        });
    });
}

/// Two pages plus a duplicate through filter, resolver and orderer.
fn bench_pipeline(c: &mut Criterion) {
    let oracle = OracleOutput::new(vec![tilted_mask(20), tilted_mask(150), tilted_mask(22)]);
    let pipeline = PagePipeline::new(FolioConfig::default());

    c.bench_function("page_pipeline (3 masks)", |b| {
        b.iter(|| {
            let analysis = pipeline.analyze(black_box(&oracle), Rotation::Deg0, 1600, 1200);
            black_box(analysis.pages.len());
        });
    });
}

criterion_group!(benches, bench_geometry_builder, bench_pipeline);
criterion_main!(benches);
