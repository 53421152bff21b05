//! Format detection for spreadsheet packages.

use crate::container::decode_xml_bytes;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// OLE compound file magic bytes, used by legacy `.xls` workbooks.
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Content type for the XLSX workbook part.
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

/// Content type for the macro-enabled workbook part.
const XLSM_CONTENT_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";

/// Content type for the template workbook part.
const XLTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml";

/// Detected spreadsheet package format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// Excel workbook (.xlsx)
    Xlsx,
    /// Macro-enabled Excel workbook (.xlsm)
    Xlsm,
    /// Excel template (.xltx)
    Xltx,
}

impl FormatType {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Xlsx => "xlsx",
            FormatType::Xlsm => "xlsm",
            FormatType::Xltx => "xltx",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            FormatType::Xlsx => "Excel Workbook",
            FormatType::Xlsm => "Excel Macro-Enabled Workbook",
            FormatType::Xltx => "Excel Template",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the format type from a file path.
///
/// # Example
///
/// ```no_run
/// use sheetjson::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("timesheet.xlsx")?;
/// println!("Detected format: {}", format);
/// # Ok::<(), sheetjson::Error>(())
/// ```
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<FormatType> {
    let mut file = File::open(path.as_ref())?;
    let mut magic = [0u8; 8];
    let read = file.read(&mut magic)?;
    check_magic(&magic[..read])?;
    file.rewind()?;
    detect_format_from_reader(BufReader::new(file))
}

/// Detect the format type from a byte slice.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FormatType> {
    check_magic(data)?;
    detect_format_from_reader(std::io::Cursor::new(data))
}

fn check_magic(data: &[u8]) -> Result<()> {
    if data.len() >= OLE_MAGIC.len() && data[..OLE_MAGIC.len()] == OLE_MAGIC {
        return Err(Error::UnsupportedFormat(
            "legacy .xls (OLE compound file)".to_string(),
        ));
    }
    if !is_zip_file(data) {
        return Err(Error::UnknownFormat);
    }
    Ok(())
}

/// Detect the format type from a reader over a ZIP package.
pub fn detect_format_from_reader<R: Read + Seek>(reader: R) -> Result<FormatType> {
    let mut archive = zip::ZipArchive::new(reader)?;

    let content_types = match archive.by_name("[Content_Types].xml") {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            decode_xml_bytes(&bytes)?
        }
        Err(_) => {
            return Err(Error::MissingComponent("[Content_Types].xml".to_string()));
        }
    };

    if content_types.contains(XLSX_CONTENT_TYPE) {
        Ok(FormatType::Xlsx)
    } else if content_types.contains(XLSM_CONTENT_TYPE) {
        Ok(FormatType::Xlsm)
    } else if content_types.contains(XLTX_CONTENT_TYPE) {
        Ok(FormatType::Xltx)
    } else if archive.file_names().any(|n| n == "xl/workbook.xml") {
        Ok(FormatType::Xlsx)
    } else if archive.file_names().any(|n| n.starts_with("word/") || n.starts_with("ppt/")) {
        Err(Error::UnsupportedFormat(
            "not a spreadsheet package".to_string(),
        ))
    } else {
        Err(Error::UnknownFormat)
    }
}

/// Check if data starts with ZIP magic bytes.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZIP_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn zip_with(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            for (name, content) in parts {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn content_types(main: &str) -> String {
        format!(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/xl/workbook.xml" ContentType="{}"/></Types>"#,
            main
        )
    }

    #[test]
    fn test_format_type_display() {
        assert_eq!(FormatType::Xlsx.to_string(), "Excel Workbook");
        assert_eq!(FormatType::Xlsm.extension(), "xlsm");
    }

    #[test]
    fn test_is_zip_file() {
        assert!(is_zip_file(&[0x50, 0x4B, 0x03, 0x04, 0x00]));
        assert!(!is_zip_file(&[0x00, 0x00, 0x00, 0x00]));
        assert!(!is_zip_file(&[0x50, 0x4B]));
    }

    #[test]
    fn test_detect_invalid_data() {
        let result = detect_format_from_bytes(&[0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_legacy_xls() {
        let mut data = OLE_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_detect_by_content_type() {
        let xlsx = zip_with(&[("[Content_Types].xml", content_types(XLSX_CONTENT_TYPE).as_str())]);
        assert_eq!(detect_format_from_bytes(&xlsx).unwrap(), FormatType::Xlsx);

        let xlsm = zip_with(&[("[Content_Types].xml", content_types(XLSM_CONTENT_TYPE).as_str())]);
        assert_eq!(detect_format_from_bytes(&xlsm).unwrap(), FormatType::Xlsm);
    }

    #[test]
    fn test_detect_by_folder_fallback() {
        let data = zip_with(&[
            ("[Content_Types].xml", "<Types/>"),
            ("xl/workbook.xml", "<workbook/>"),
        ]);
        assert_eq!(detect_format_from_bytes(&data).unwrap(), FormatType::Xlsx);
    }

    #[test]
    fn test_detect_word_document_rejected() {
        let data = zip_with(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<document/>"),
        ]);
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_content_types() {
        let data = zip_with(&[("xl/workbook.xml", "<workbook/>")]);
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::MissingComponent(_))
        ));
    }
}
