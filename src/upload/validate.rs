use std::path::Path;

pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Check a file against the upload rules, collecting every violation.
pub fn validate_file(
    file_name: Option<&str>,
    content_type: Option<&str>,
    size: usize,
    max_file_size: usize,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match file_name.filter(|n| !n.is_empty()) {
        None => errors.push("File name is required".to_string()),
        Some(name) => {
            let ext = extension(name);
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                errors.push(format!(
                    "File extension '{ext}' not allowed. Allowed: {}",
                    ALLOWED_EXTENSIONS.join(", ")
                ));
            }

            if let Some(ct) = content_type.filter(|ct| !ct.is_empty()) {
                if !ALLOWED_MIME_TYPES.contains(&ct) {
                    errors.push(format!("MIME type '{ct}' not allowed"));
                }
            }
        }
    }

    if size > max_file_size {
        errors.push(format!(
            "File size {size} exceeds maximum allowed size of {max_file_size} bytes"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Lowercased extension including the dot, or an empty string.
fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10 * 1024 * 1024;

    #[test]
    fn test_valid_png() {
        assert!(validate_file(Some("cat.png"), Some("image/png"), 1024, MAX).is_ok());
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert!(validate_file(Some("CAT.JPEG"), Some("image/jpeg"), 1, MAX).is_ok());
    }

    #[test]
    fn test_missing_content_type_is_accepted() {
        assert!(validate_file(Some("cat.webp"), None, 1, MAX).is_ok());
    }

    #[test]
    fn test_missing_name() {
        let errors = validate_file(None, Some("image/png"), 1, MAX).unwrap_err();
        assert_eq!(errors, vec!["File name is required"]);
    }

    #[test]
    fn test_bad_extension() {
        let errors = validate_file(Some("notes.txt"), None, 1, MAX).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("File extension '.txt' not allowed"));
    }

    #[test]
    fn test_no_extension() {
        let errors = validate_file(Some("README"), None, 1, MAX).unwrap_err();
        assert!(errors[0].starts_with("File extension '' not allowed"));
    }

    #[test]
    fn test_collects_all_violations() {
        let errors = validate_file(Some("doc.pdf"), Some("application/pdf"), MAX + 1, MAX)
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[1].contains("MIME type 'application/pdf' not allowed"));
        assert!(errors[2].contains("exceeds maximum allowed size"));
    }

    #[test]
    fn test_size_at_limit_is_accepted() {
        assert!(validate_file(Some("a.gif"), Some("image/gif"), MAX, MAX).is_ok());
    }
}
