use std::path::Path;

use validator::ValidationError;

fn is_file(path: &Path) -> Result<(), &'static str> {
    if !path.exists() {
        return Err("File does not exist");
    }

    if !path.is_file() {
        return Err("Path is not a valid file");
    }

    Ok(())
}

pub fn validate_is_file(path: &Path) -> Result<(), ValidationError> {
    if let Err(e) = is_file(path) {
        return Err(ValidationError::new(e));
    }

    Ok(())
}

/// The failure manifest is written as CSV or JSON, picked by extension.
pub fn validate_manifest_path(path: &Path) -> Result<(), ValidationError> {
    let ext = path
        .extension()
        .map(|x| x.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if !matches!(ext.as_str(), "csv" | "json") {
        return Err(ValidationError::new(
            "Failure manifest must have a .csv or .json extension",
        ));
    }

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => Err(
            ValidationError::new("Failure manifest directory does not exist"),
        ),
        _ => Ok(()),
    }
}

#[must_use]
pub fn value_parser_parse_valid_file() -> impl clap::builder::TypedValueParser {
    move |s: &str| {
        let path = Path::new(s);
        is_file(path)?;

        let path = path
            .to_path_buf()
            .canonicalize()
            .map_err(|_| "Failed to canonicalize path")?;

        Ok::<_, &str>(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_extension_is_checked() {
        assert!(validate_manifest_path(Path::new("failed.csv")).is_ok());
        assert!(validate_manifest_path(Path::new("failed.JSON")).is_ok());
        assert!(validate_manifest_path(Path::new("failed.xlsx")).is_err());
        assert!(validate_manifest_path(Path::new("failed")).is_err());
    }

    #[test]
    fn manifest_parent_must_exist() {
        assert!(validate_manifest_path(Path::new("/definitely/not/here/failed.csv")).is_err());
    }
}
