//! Crash-safe replacement of small files (the TOML config after calibration).
use std::{fs, io::Write, path::Path};

/// Write `bytes` next to `path` and rename over it, so readers see either the
/// old or the new contents and never a truncated file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockguard.toml");
        fs::write(&path, "[monitor]\n").unwrap();

        write_atomic(&path, b"[monitor]\nthreshold_cm = 120.0\n").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[monitor]\nthreshold_cm = 120.0\n"
        );
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
