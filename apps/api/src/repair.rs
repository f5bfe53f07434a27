//! One-off repair for a UUID that was pasted into a regular-expression
//! escape (`\<uuid>`) in the frontend prompt manager.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use tracing::info;

pub const DEFAULT_TARGET: &str = "frontend/src/lib/promptManager.ts";

fn escaped_uuid() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\\+)([a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})")
            .expect("static regex must compile")
    })
}

/// Doubles the backslash in front of every UUID preceded by an odd run of
/// backslashes. Even runs are already escaped and left alone, which makes
/// the repair idempotent.
///
/// Returns the fixed text and the number of repairs, or `None` when nothing
/// needed fixing.
pub fn repair_escaped_uuids(content: &str) -> Option<(String, usize)> {
    let mut fixed = 0;
    let repaired = escaped_uuid().replace_all(content, |caps: &Captures| {
        let slashes = &caps[1];
        if slashes.len() % 2 == 1 {
            fixed += 1;
            format!("{slashes}\\{}", &caps[2])
        } else {
            caps[0].to_string()
        }
    });

    (fixed > 0).then(|| (repaired.into_owned(), fixed))
}

/// Applies `repair_escaped_uuids` to a file in place. Returns the number of
/// repairs; 0 means the file was left untouched.
pub fn repair_file(path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;

    match repair_escaped_uuids(&content) {
        Some((repaired, fixed)) => {
            std::fs::write(path, repaired)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!("Repaired {fixed} escaped UUID(s) in {}", path.display());
            Ok(fixed)
        }
        None => Ok(0),
    }
}
