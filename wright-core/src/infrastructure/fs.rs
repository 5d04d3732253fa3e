// wright-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Writes `content` through a temporary file in the target directory, then
/// renames it into place. Readers see either the old file or the new one.
/// Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_missing_dirs() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("target/gl_mart/01_VW_1.sql");

        atomic_write(&file_path, "CREATE OR REPLACE VIEW V AS SELECT 1;\n")?;

        assert_eq!(
            fs::read_to_string(file_path)?,
            "CREATE OR REPLACE VIEW V AS SELECT 1;\n"
        );
        Ok(())
    }

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("deploy_order.json");

        atomic_write(&file_path, "{}")?;
        atomic_write(&file_path, "[]")?;

        assert_eq!(fs::read_to_string(file_path)?, "[]");
        let leftovers = fs::read_dir(dir.path())?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }
}
