// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For displaying what was found and what was changed

use crate::batch::Totals;
use crate::fixer::Outcome;
use std::io::Write;

const SEPARATOR: &str = "------------------------------------";

/// A byte count displayed with a binary prefix
///
/// # Example
///
/// ```
/// use flac_fixer::report::Bytes;
///
/// assert_eq!(Bytes(500).to_string(), "500.0 B");
/// assert_eq!(Bytes(8192).to_string(), "8.0 KiB");
/// assert_eq!(Bytes(1536 * 1024).to_string(), "1.5 MiB");
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Bytes(pub u64);

impl std::fmt::Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        const PREFIXES: [&str; 7] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];

        let mut size = self.0 as f64;
        for prefix in PREFIXES {
            if size < 1024.0 {
                return write!(f, "{size:.1} {prefix}B");
            }
            size /= 1024.0;
        }
        write!(f, "{size:.1} ZiB")
    }
}

/// Writes a block of text describing a single file
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_outcome<W: Write>(mut w: W, outcome: &Outcome) -> std::io::Result<()> {
    let before = &outcome.before;

    writeln!(w, "{SEPARATOR}")?;
    writeln!(
        w,
        "{} ({})",
        before.display_path().display(),
        Bytes(before.byte_size())
    )?;

    for tag in before.legacy_tags() {
        writeln!(w, " {tag} tags")?;
    }

    if before.padding_blocks().is_empty() {
        writeln!(w, " No padding found")?;
    } else {
        for size in before.padding_blocks() {
            writeln!(w, " Padding block: {}", Bytes((*size).into()))?;
        }
    }

    if before.pictures().is_empty() {
        writeln!(w, " No pictures found")?;
    } else {
        for picture in before.pictures() {
            writeln!(
                w,
                " Picture: {}×{} {} ({})",
                picture.width,
                picture.height,
                picture.media_type,
                Bytes(picture.byte_length as u64)
            )?;
        }
    }

    // when checking only, there's nothing more to say
    let Some(after) = &outcome.after else {
        return Ok(());
    };

    writeln!(w)?;

    match after.pictures().len() {
        0 if !before.pictures().is_empty() => {
            writeln!(w, " {} pictures removed", outcome.pictures_removed())?
        }
        0 => {}
        remaining => writeln!(w, " {remaining} pictures remaining")?,
    }

    if after.padding_total() != before.padding_total() {
        writeln!(w, " New padding: {}", Bytes(after.padding_total()))?;
    } else {
        writeln!(
            w,
            " Padding was left as found: {}",
            Bytes(after.padding_total())
        )?;
    }

    match outcome.size_reduction() {
        0 => Ok(()),
        r if r > 0 => writeln!(w, " File size reduction: {}", Bytes(r.unsigned_abs())),
        r => writeln!(w, " File size increase: {}", Bytes(r.unsigned_abs())),
    }
}

/// Writes a closing summary of the whole run
///
/// Totals are only given when more than one file was processed.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_footer<W: Write>(mut w: W, totals: &Totals) -> std::io::Result<()> {
    writeln!(w, "{SEPARATOR}")?;

    if totals.files > 1 && (totals.removed > 0 || totals.added > 0) {
        writeln!(w)?;
        if totals.removed > 0 {
            writeln!(w, "A total of {} was removed", Bytes(totals.removed))?;
        }
        if totals.added > 0 {
            writeln!(w, "A total of {} was added", Bytes(totals.added))?;
        }
    }

    Ok(())
}
