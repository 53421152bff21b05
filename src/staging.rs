//! Temporary storage for uploaded workbooks.
//!
//! An upload is written to disk, read back by the workbook reader and then
//! released. Release happens when the [`StagedUpload`] is dropped, so the
//! staged file is removed whether processing succeeds, fails or unwinds.

use crate::error::Result;
use crate::model::WorkbookResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// A staged upload on disk. Dropping it releases the file.
pub trait StagedUpload {
    /// Location of the staged file.
    fn path(&self) -> &Path;
}

/// Somewhere uploads can be staged.
pub trait StagingArea {
    /// Handle to one staged upload.
    type Upload: StagedUpload;

    /// Write `bytes` to a fresh staged file.
    fn stage(&self, bytes: &[u8]) -> Result<Self::Upload>;
}

/// Stages uploads as uniquely named files in a directory.
#[derive(Debug, Clone)]
pub struct TempDirStaging {
    dir: PathBuf,
}

impl TempDirStaging {
    /// Stage into `dir`, creating it if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Stage into the system temp directory.
    pub fn system() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }

    /// The staging directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StagingArea for TempDirStaging {
    type Upload = TempUpload;

    fn stage(&self, bytes: &[u8]) -> Result<TempUpload> {
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".xlsx")
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!(path = %file.path().display(), size = bytes.len(), "Staged upload");
        Ok(TempUpload { file: Some(file) })
    }
}

/// A file staged by [`TempDirStaging`].
#[derive(Debug)]
pub struct TempUpload {
    file: Option<NamedTempFile>,
}

impl StagedUpload for TempUpload {
    fn path(&self) -> &Path {
        self.file
            .as_ref()
            .map(|f| f.path())
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!(path = %path.display(), "Released staged upload"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged upload"),
            }
        }
    }
}

/// Stage an uploaded workbook, normalize it and release the staged file.
///
/// The staged file is gone by the time this returns, on success and on
/// error alike.
pub fn process_upload<S: StagingArea>(staging: &S, bytes: &[u8]) -> Result<WorkbookResult> {
    let upload = staging.stage(bytes)?;
    crate::convert_file(upload.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;
    use zip::write::SimpleFileOptions;

    fn minimal_xlsx() -> Vec<u8> {
        let parts = [
            (
                "[Content_Types].xml",
                r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#,
            ),
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Master" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/></Relationships>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Hours</t></is></c></row><row r="2"><c r="A2"><v>8</v></c></row></sheetData></worksheet>"#,
            ),
        ];

        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            for (name, content) in parts {
                zip.start_file(name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_stage_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path()).unwrap();

        let upload = staging.stage(b"payload").unwrap();
        let path = upload.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");

        drop(upload);
        assert!(!path.exists());
    }

    #[test]
    fn test_new_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads").join("incoming");

        let staging = TempDirStaging::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(staging.dir(), nested.as_path());
    }

    #[test]
    fn test_process_upload_releases_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path()).unwrap();

        let result = process_upload(&staging, &minimal_xlsx()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("Master").unwrap().data().len(), 1);
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[test]
    fn test_process_upload_releases_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let staging = TempDirStaging::new(dir.path()).unwrap();

        let result = process_upload(&staging, b"not a workbook");
        assert!(matches!(result, Err(Error::UnknownFormat)));
        assert_eq!(staged_files(dir.path()), 0);
    }
}
