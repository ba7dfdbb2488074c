// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output naming and batch-wide page numbering.

use folio_core::config::ResequenceOptions;

/// Letter suffix of the page at 1-based `position`: `a`, `b`, ... `z`,
/// then `aa`, `ab`, ...
pub fn page_suffix(position: usize) -> String {
    let mut n = position.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'a' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

/// Relative output name of one page.
///
/// The photograph's directory is kept; the stem gets the page suffix and,
/// when resequencing, a zero-padded 4-digit prefix.
pub fn output_name(img_path: &str, position: usize, sequence: Option<u32>, extension: &str) -> String {
    let path = std::path::Path::new(img_path);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| img_path.to_owned());
    let suffix = page_suffix(position);
    let file = match sequence {
        Some(seq) => format!("{seq:04}_{stem}{suffix}.{extension}"),
        None => format!("{stem}{suffix}.{extension}"),
    };
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => format!("{}/{file}", parent.to_string_lossy().replace('\\', "/")),
        None => file,
    }
}

/// Hands out consecutive page numbers across a batch.
#[derive(Debug, Clone)]
pub struct Resequencer {
    enabled: bool,
    next: u32,
}

impl Resequencer {
    pub fn new(options: &ResequenceOptions) -> Self {
        Self {
            enabled: options.enabled,
            next: options.first_number,
        }
    }

    /// Numbers for the `count` pages of the next photograph; all `None` when
    /// resequencing is off.
    pub fn assign(&mut self, count: usize) -> Vec<Option<u32>> {
        (0..count)
            .map(|_| {
                if !self.enabled {
                    return None;
                }
                let n = self.next;
                self.next += 1;
                Some(n)
            })
            .collect()
    }
}
