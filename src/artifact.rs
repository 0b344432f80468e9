use std::{
    collections::HashSet,
    fs,
    io::{Cursor, Write},
    path::Path,
};

use zip::write::SimpleFileOptions;

use crate::types::BatchResult;

pub const ARCHIVE_NAME: &str = "mix_caption_results.zip";

const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Strip directory components and replace characters that are not allowed
/// in file names.
pub fn safe_filename(label: &str) -> String {
    let base = label.rsplit(['/', '\\']).next().unwrap_or(label);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "image".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `photos/cat.jpg` becomes `cat.txt`.
pub fn artifact_name(label: &str) -> String {
    let safe = safe_filename(label);
    let stem = match safe.rfind('.') {
        Some(0) | None => safe.as_str(),
        Some(dot) => &safe[..dot],
    };
    format!("{}.txt", stem)
}

/// One file name per artifact, in order. A name already taken gets the
/// lowest free `_2`, `_3`, ... suffix, so every name is unique.
pub fn artifact_names(result: &BatchResult) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    result
        .artifacts
        .iter()
        .map(|artifact| {
            let mut name = artifact_name(&artifact.label);
            if taken.contains(&name) {
                let stem = name.trim_end_matches(".txt").to_string();
                let mut n = 2;
                while taken.contains(&name) {
                    name = format!("{}_{}.txt", stem, n);
                    n += 1;
                }
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Zip archive with one text file per item.
pub fn write_archive(result: &BatchResult) -> anyhow::Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (artifact, name) in result.artifacts.iter().zip(artifact_names(result)) {
        zip.start_file(name, options)?;
        zip.write_all(artifact.content.render().as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Write one text file per item into `dir`, returning the written names.
pub fn write_dir(result: &BatchResult, dir: impl AsRef<Path>) -> anyhow::Result<Vec<String>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let names = artifact_names(result);
    for (artifact, name) in result.artifacts.iter().zip(&names) {
        fs::write(dir.join(name), artifact.content.render())?;
    }

    tracing::info!(count = names.len(), dir = %dir.display(), "wrote caption files");
    Ok(names)
}
