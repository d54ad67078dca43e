//! Scene description passed along with every advice request.

use std::path::Path;
use tracing::warn;

pub const CONTEXT_NOT_PROVIDED: &str = "No scene description provided";
pub const CONTEXT_EMPTY: &str = "Scene description file is empty";

/// Reads the scene description from an optional plain-text file.
///
/// Never fails: a missing path, a missing file, an empty file or a read error each
/// produce a short placeholder. Non-UTF-8 bytes are replaced.
pub fn read_context_text(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return CONTEXT_NOT_PROVIDED.to_string();
    };
    if !path.exists() {
        return format!("Scene description file not found: {}", path.display());
    }
    match std::fs::read(path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            if text.trim().is_empty() {
                CONTEXT_EMPTY.to_string()
            } else {
                text.into_owned()
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read scene description");
            format!("Failed to read scene description: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(read_context_text(None), CONTEXT_NOT_PROVIDED);
        let missing = read_context_text(Some(Path::new("/nonexistent/notes.txt")));
        assert!(missing.starts_with("Scene description file not found"));
    }

    #[test]
    fn test_reads_and_detects_empty_files() -> std::io::Result<()> {
        let dir = std::env::temp_dir();
        let full = dir.join(format!("panocrop_ctx_full_{}.txt", std::process::id()));
        let empty = dir.join(format!("panocrop_ctx_empty_{}.txt", std::process::id()));
        std::fs::write(&full, "Camera faces north, lake on the left")?;
        std::fs::write(&empty, "  \n")?;
        assert_eq!(
            read_context_text(Some(&full)),
            "Camera faces north, lake on the left"
        );
        assert_eq!(read_context_text(Some(&empty)), CONTEXT_EMPTY);
        std::fs::remove_file(full)?;
        std::fs::remove_file(empty)?;
        Ok(())
    }
}
