//! Collision-free file naming
//!
//! The same policy names files on disk and entries inside export archives: sanitize the
//! desired name, then append `-1`, `-2`, ... before the extension until the name is free.
//! On disk, "free" is decided by exclusive file creation so concurrent writers cannot
//! claim the same name.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{File, OpenOptions};

/// Longest sanitized name kept as-is
pub const MAX_FILENAME_LEN: usize = 200;

/// Stem length kept when an overlong name is shortened
const TRUNCATED_STEM_LEN: usize = 190;

/// Upper bound on collision suffixes tried before giving up
const MAX_SUFFIX: usize = 10_000;

/// A set of names within which a resolved name must be unique
pub trait Namespace {
    fn contains(&self, name: &str) -> bool;
}

impl Namespace for HashSet<String> {
    fn contains(&self, name: &str) -> bool {
        HashSet::contains(self, name)
    }
}

/// Replace characters outside `[A-Za-z0-9._-]` with `-`, collapse runs of `-`, trim
/// leading and trailing `-`, and shorten names longer than [`MAX_FILENAME_LEN`].
pub fn sanitize_filename(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '-'
        };
        if c == '-' && cleaned.ends_with('-') {
            continue;
        }
        cleaned.push(c);
    }

    let cleaned = cleaned.trim_matches('-');
    if cleaned.chars().all(|c| c == '.') {
        return format!("image-{}.jpg", chrono::Utc::now().timestamp());
    }

    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned.to_string();
    }

    // Only ASCII remains, so byte offsets are char boundaries.
    let shortened = match split_extension(cleaned) {
        (stem, Some(ext)) => format!("{}.{}", &stem[..stem.len().min(TRUNCATED_STEM_LEN)], ext),
        (stem, None) => stem[..TRUNCATED_STEM_LEN].to_string(),
    };
    shortened[..shortened.len().min(MAX_FILENAME_LEN)].to_string()
}

/// Split `name` into stem and extension. A leading dot does not start an extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Sanitized `desired` followed by its suffixed variants
fn candidates(desired: &str) -> impl Iterator<Item = String> {
    let name = sanitize_filename(desired);
    let (stem, ext) = split_extension(&name);
    let (stem, ext) = (stem.to_string(), ext.map(str::to_string));

    std::iter::once(name.clone()).chain((1..=MAX_SUFFIX).map(move |n| match &ext {
        Some(ext) => format!("{}-{}.{}", stem, n, ext),
        None => format!("{}-{}", stem, n),
    }))
}

/// First candidate name for `desired` not yet present in `namespace`
pub fn resolve_unique<N: Namespace + ?Sized>(namespace: &N, desired: &str) -> String {
    let mut last = String::new();
    for candidate in candidates(desired) {
        if !namespace.contains(&candidate) {
            return candidate;
        }
        last = candidate;
    }
    last
}

/// Create a new file in `dir` under the first free candidate name for `desired`
///
/// Returns the open file and the name it was created under.
pub async fn create_unique(dir: &Path, desired: &str) -> std::io::Result<(File, String)> {
    for candidate in candidates(desired) {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&candidate))
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for '{}' in {}", desired, dir.display()),
    ))
}

/// Lowercase `text`, collapse runs of anything but `[a-z0-9]` into `-`, trim `-`;
/// falls back to `export` when nothing is left.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "export".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("summer photo (1).JPG"), "summer-photo-1-.JPG");
        assert_eq!(sanitize_filename("--a//b--"), "a-b");
        assert_eq!(sanitize_filename("ürün_1.png"), "r-n_1.png");
        assert_eq!(sanitize_filename("ok-name_2.webp"), "ok-name_2.webp");
        assert!(sanitize_filename("???").starts_with("image-"));
        assert!(sanitize_filename("..").starts_with("image-"));
    }

    #[test]
    fn test_sanitize_shortens_long_names_keeping_extension() {
        let long = format!("{}.jpeg", "a".repeat(300));
        let name = sanitize_filename(&long);
        assert_eq!(name, format!("{}.jpeg", "a".repeat(190)));

        let no_ext = "b".repeat(250);
        assert_eq!(sanitize_filename(&no_ext).len(), 190);
        assert_eq!(sanitize_filename(&"c".repeat(200)).len(), 200);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("photo.jpg"), ("photo", Some("jpg")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
        assert_eq!(split_extension("plain"), ("plain", None));
    }

    #[test]
    fn test_resolve_unique_appends_counter_before_extension() {
        let mut taken: HashSet<String> = HashSet::new();

        for expected in ["photo.jpg", "photo-1.jpg", "photo-2.jpg"] {
            let name = resolve_unique(&taken, "photo.jpg");
            assert_eq!(name, expected);
            taken.insert(name);
        }

        assert_eq!(resolve_unique(&taken, "photo"), "photo");
        taken.insert("photo".to_string());
        assert_eq!(resolve_unique(&taken, "photo"), "photo-1");
    }

    #[test]
    fn test_resolve_unique_sanitizes_before_comparing() {
        let taken: HashSet<String> = ["my-photo.jpg".to_string()].into_iter().collect();
        assert_eq!(resolve_unique(&taken, "my photo.jpg"), "my-photo-1.jpg");
    }

    #[tokio::test]
    async fn test_create_unique_in_directory() {
        let dir = tempfile::tempdir().unwrap();

        let mut names = Vec::new();
        for _ in 0..3 {
            let (_file, name) = create_unique(dir.path(), "photo.jpg").await.unwrap();
            names.push(name);
        }

        assert_eq!(names, vec!["photo.jpg", "photo-1.jpg", "photo-2.jpg"]);
        assert!(dir.path().join("photo-2.jpg").exists());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Summer Kettle 2.0 (Red)"), "summer-kettle-2-0-red");
        assert_eq!(slugify("  --ACME--  "), "acme");
        assert_eq!(slugify("!!!"), "export");
        assert_eq!(slugify(""), "export");
    }
}
