//! ZIP package access for spreadsheet files.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// Byte order of a UTF-16 part.
#[derive(Debug, Clone, Copy)]
enum Utf16 {
    Le,
    Be,
}

/// Decode a package part to text.
///
/// Parts are normally UTF-8. UTF-16 parts (with or without a byte order
/// mark) are transcoded, and their XML declaration is relabelled as UTF-8 so
/// quick-xml does not try to decode the text a second time.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    let (body, utf16) = match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => (rest, None),
        [0xFF, 0xFE, rest @ ..] => (rest, Some(Utf16::Le)),
        [0xFE, 0xFF, rest @ ..] => (rest, Some(Utf16::Be)),
        _ => (bytes, None),
    };

    let utf16 = match utf16 {
        Some(order) => Some(order),
        None => match std::str::from_utf8(body) {
            Ok(text) => return Ok(text.to_string()),
            // ASCII markup in UTF-16 leaves every other byte zero
            Err(_) => match body {
                [_, 0, _, 0, ..] => Some(Utf16::Le),
                [0, _, 0, _, ..] => Some(Utf16::Be),
                _ => None,
            },
        },
    };

    match utf16 {
        Some(order) => Ok(relabel_utf16_declaration(decode_utf16(body, order)?)),
        None => Ok(String::from_utf8_lossy(body).into_owned()),
    }
}

fn decode_utf16(bytes: &[u8], order: Utf16) -> Result<String> {
    let units = bytes.chunks_exact(2).map(|pair| match order {
        Utf16::Le => u16::from_le_bytes([pair[0], pair[1]]),
        Utf16::Be => u16::from_be_bytes([pair[0], pair[1]]),
    });

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::InvalidData(format!("malformed UTF-16 part: {}", e)))
}

fn relabel_utf16_declaration(text: String) -> String {
    let Some(end) = text.strip_prefix("<?xml").and_then(|_| text.find("?>")) else {
        return text;
    };

    let (declaration, rest) = text.split_at(end);
    let lowered = declaration.to_ascii_lowercase();
    match lowered.find("utf-16") {
        Some(at) => format!("{}UTF-8{}", &declaration[..at], &declaration[at + 6..]) + rest,
        None => text,
    }
}

/// A spreadsheet package: the ZIP archive behind an `.xlsx` file.
pub struct Package {
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl Package {
    /// Open a package from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bytes(std::fs::read(path.as_ref())?)
    }

    /// Create a package from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(data))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Read an XML part as a string, decoding UTF-8 or UTF-16.
    pub fn read_xml(&self, path: &str) -> Result<String> {
        let mut archive = self.archive.borrow_mut();
        let mut file = archive
            .by_name(path)
            .map_err(|_| Error::MissingComponent(path.to_string()))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        decode_xml_bytes(&bytes)
    }

    /// Check if a part exists in the package.
    pub fn exists(&self, path: &str) -> bool {
        let archive = self.archive.borrow();
        let found = archive.file_names().any(|n| n == path);
        found
    }

    /// List all parts in the package.
    pub fn list_files(&self) -> Vec<String> {
        let archive = self.archive.borrow();
        archive.file_names().map(String::from).collect()
    }

    /// Read the relationships of a part as a map from relationship id to
    /// resolved part path. A part without a `.rels` file has no relationships.
    pub fn read_relationships(&self, part_path: &str) -> Result<HashMap<String, String>> {
        let path = Path::new(part_path);
        let parent = path.parent().unwrap_or(Path::new(""));
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();
        let rels_path = if parent.as_os_str().is_empty() {
            format!("_rels/{}.rels", file_name)
        } else {
            format!("{}/_rels/{}.rels", parent.display(), file_name)
        };

        let content = match self.read_xml(&rels_path) {
            Ok(c) => c,
            Err(Error::MissingComponent(_)) => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };

        let mut rels = HashMap::new();
        let mut reader = quick_xml::Reader::from_str(&content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Empty(e)) | Ok(quick_xml::events::Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut external = false;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                            b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                            b"TargetMode" => {
                                external = attr.value.eq_ignore_ascii_case(b"external")
                            }
                            _ => {}
                        }
                    }

                    if !id.is_empty() && !target.is_empty() && !external {
                        rels.insert(id, Self::resolve_path(part_path, &target));
                    }
                }
                Ok(quick_xml::events::Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Resolve a relationship target against the part that declares it.
    pub fn resolve_path(base: &str, relative: &str) -> String {
        if let Some(stripped) = relative.strip_prefix('/') {
            return stripped.to_string();
        }

        let base_dir = Path::new(base).parent().unwrap_or(Path::new(""));
        let mut result = PathBuf::from(base_dir);
        for component in Path::new(relative).components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(c) => result.push(c),
                _ => {}
            }
        }

        result.to_string_lossy().replace('\\', "/")
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("files", &self.list_files().len())
            .finish()
    }
}
