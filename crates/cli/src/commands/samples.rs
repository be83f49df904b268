//! `tryon samples`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::SamplesArgs;

const SAMPLE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn run(args: SamplesArgs) -> Result<()> {
    let samples = list_samples(&args.dir)?;
    if samples.is_empty() {
        println!("No sample images in {}", args.dir.display());
        return Ok(());
    }
    for path in samples {
        println!("{}", path.display());
    }
    Ok(())
}

/// Image files directly under `dir`, sorted by path. A missing directory
/// yields an empty list.
pub fn list_samples(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut samples = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && is_sample_image(&path) {
            samples.push(path);
        }
    }
    samples.sort();
    Ok(samples)
}

fn is_sample_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SAMPLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_images_sorted_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "c.jpeg", "notes.txt", "d.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<String> = list_samples(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_samples(&dir.path().join("absent")).unwrap().is_empty());
    }
}
