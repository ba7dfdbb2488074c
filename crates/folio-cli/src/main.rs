// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — extract manuscript pages from photographed spreads.
//
// Entry point. Initialises logging, loads the configuration and drives one
// batch over a local folder of photographs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use folio_batch::{BatchRunner, LocalStore};
use folio_core::FolioConfig;
use folio_core::error::Result;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Extract manuscript pages from photographed spreads")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Select, extract and write the pages of every photograph in a folder.
    Run {
        /// Folder of photographs with their oracle output.
        folder: PathBuf,
        /// JSON configuration; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory for pages.
        #[arg(long, default_value = "pages")]
        out: PathBuf,
        /// Override the configured number of parallel workers.
        #[arg(long)]
        concurrency: Option<usize>,
        /// Re-run page selection even where pages are already recorded.
        #[arg(long)]
        reanalyze: bool,
        /// Also write the batch report to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Scan a folder and write a fresh folio.json without processing it.
    Scan {
        folder: PathBuf,
    },
    /// Write the default configuration to a file.
    InitConfig {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "Folio failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run {
            folder,
            config,
            out,
            concurrency,
            reanalyze,
            report,
        } => {
            let mut cfg = match config {
                Some(path) => FolioConfig::load(path)?,
                None => FolioConfig::default(),
            };
            if let Some(n) = concurrency {
                cfg.batch.concurrency = n;
            }
            cfg.batch.reanalyze |= reanalyze;

            let out = if out.is_absolute() { out } else { folder.join(out) };
            let store = Arc::new(LocalStore::new(&folder, out));
            let mut record = store.load_or_scan()?;
            tracing::info!(folder = %folder.display(), photos = record.files.len(), "Folio starting");

            let runner = BatchRunner::new(cfg, store.clone(), store.clone(), store.clone())?;
            let summary = runner.run(&mut record).await?;
            store.save_record(&record)?;

            let json = serde_json::to_string_pretty(&summary)?;
            if let Some(path) = report {
                std::fs::write(path, &json)?;
            }
            println!("{json}");
            Ok(if summary.is_clean() { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
        Command::Scan { folder } => {
            let store = LocalStore::new(&folder, folder.join("pages"));
            let record = store.scan()?;
            store.save_record(&record)?;
            tracing::info!(path = %store.record_path().display(), photos = record.files.len(), "Folder record written");
            Ok(ExitCode::SUCCESS)
        }
        Command::InitConfig { path } => {
            FolioConfig::default().save(&path)?;
            tracing::info!(path = %path.display(), "Default configuration written");
            Ok(ExitCode::SUCCESS)
        }
    }
}
