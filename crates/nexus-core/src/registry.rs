//! Model file discovery and path resolution.
//!
//! Stateless helpers over the configured model directories. Listings return
//! sorted basenames so the UI renders stably across platforms.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extension of text model files.
const TEXT_MODEL_EXT: &str = "gguf";

/// List GGUF files in `dir`, sorted by basename.
pub fn list_text_models(dir: &Path) -> Result<Vec<String>> {
    let entries = read_dir(dir)?;
    let mut models: Vec<String> = entries
        .into_iter()
        .filter(|(path, _)| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(TEXT_MODEL_EXT))
        })
        .map(|(_, name)| name)
        .collect();
    models.sort();
    Ok(models)
}

/// List all regular files in `dir` (dotfiles excluded), sorted. The image
/// directory holds multiple model formats, so no extension filter here.
pub fn list_image_models(dir: &Path) -> Result<Vec<String>> {
    let entries = read_dir(dir)?;
    let mut models: Vec<String> = entries
        .into_iter()
        .filter(|(path, name)| path.is_file() && !name.starts_with('.'))
        .map(|(_, name)| name)
        .collect();
    models.sort();
    Ok(models)
}

/// List immediate subdirectories of `dir`, sorted.
pub fn list_subfolders(dir: &Path) -> Result<Vec<String>> {
    let entries = read_dir(dir)?;
    let mut folders: Vec<String> = entries
        .into_iter()
        .filter(|(path, _)| path.is_dir())
        .map(|(_, name)| name)
        .collect();
    folders.sort();
    Ok(folders)
}

/// Create `root/name`. The name must be a plain directory name; anything
/// that could climb out of `root` is rejected.
pub fn create_subfolder(root: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(Error::BadRequest("invalid folder name".to_string()));
    }
    let path = root.join(name);
    std::fs::create_dir_all(&path)
        .map_err(|err| Error::internal(format!("could not create {}: {err}", path.display()), ""))?;
    Ok(path)
}

/// Resolve a model reference against a base directory.
///
/// `base/path` wins when it exists; otherwise `path` is tried as an
/// already-absolute location; otherwise the joined path is reported as not
/// found.
pub fn resolve_model_path(base: &Path, path: &str) -> Result<PathBuf> {
    let joined = base.join(path);
    if joined.exists() {
        return Ok(joined);
    }
    let direct = PathBuf::from(path);
    if direct.exists() {
        return Ok(direct);
    }
    Err(Error::NotFound(joined.display().to_string()))
}

fn read_dir(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    if !dir.exists() {
        return Err(Error::NotFound(dir.display().to_string()));
    }
    let entries = std::fs::read_dir(dir)
        .map_err(|err| Error::internal(format!("could not read {}: {err}", dir.display()), ""))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            (entry.path(), name)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_gguf_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.gguf", "a.gguf", "c.gguf", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.gguf")).unwrap();

        let models = list_text_models(dir.path()).unwrap();
        assert_eq!(models, vec!["a.gguf", "b.gguf", "c.gguf"]);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            list_text_models(&missing),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn image_listing_skips_dotfiles_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.safetensors"), b"x").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::create_dir(dir.path().join("outputs")).unwrap();

        let models = list_image_models(dir.path()).unwrap();
        assert_eq!(models, vec!["model.safetensors"]);
        assert_eq!(list_subfolders(dir.path()).unwrap(), vec!["outputs"]);
    }

    #[test]
    fn subfolder_names_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "..", "../etc", "a/b", "a\\b"] {
            assert!(matches!(
                create_subfolder(dir.path(), bad),
                Err(Error::BadRequest(_))
            ));
        }
        let created = create_subfolder(dir.path(), "portraits").unwrap();
        assert!(created.is_dir());
    }

    #[test]
    fn resolution_prefers_base_then_falls_back_to_absolute() {
        let base = tempfile::tempdir().unwrap();
        fs::write(base.path().join("m.gguf"), b"x").unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let abs = elsewhere.path().join("other.gguf");
        fs::write(&abs, b"x").unwrap();

        assert_eq!(
            resolve_model_path(base.path(), "m.gguf").unwrap(),
            base.path().join("m.gguf")
        );
        assert_eq!(
            resolve_model_path(base.path(), abs.to_str().unwrap()).unwrap(),
            abs
        );
        assert!(matches!(
            resolve_model_path(base.path(), "ghost.gguf"),
            Err(Error::NotFound(msg)) if msg.contains("ghost.gguf")
        ));
    }
}
