//! XLSX styles parsing for cell number formats.

use crate::model::NumberFormat;
use std::collections::HashMap;
use std::sync::Arc;

/// Number-format information parsed from xl/styles.xml.
#[derive(Debug, Default)]
pub struct Styles {
    /// Cell style formats by style index; `None` for General
    formats: Vec<Option<Arc<NumberFormat>>>,
}

impl Styles {
    /// Parse styles from xl/styles.xml content.
    ///
    /// Malformed content yields whatever was read before the error; styles
    /// only decide how numbers are displayed.
    pub fn parse(xml: &str) -> Self {
        // numFmtId -> formatCode for custom formats
        let mut num_fmts: HashMap<u32, String> = HashMap::new();
        // style index -> numFmtId
        let mut cell_xfs: Vec<u32> = Vec::new();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut in_num_fmts = false;
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => match e.name().as_ref() {
                    b"numFmts" => in_num_fmts = true,
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => cell_xfs.push(Self::xf_num_fmt_id(e)),
                    _ => {}
                },
                Ok(quick_xml::events::Event::Empty(ref e)) => match e.name().as_ref() {
                    b"numFmt" if in_num_fmts => {
                        let mut num_fmt_id: Option<u32> = None;
                        let mut format_code = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"numFmtId" => {
                                    num_fmt_id = String::from_utf8_lossy(&attr.value).parse().ok();
                                }
                                b"formatCode" => {
                                    format_code = attr
                                        .unescape_value()
                                        .map(|v| v.to_string())
                                        .unwrap_or_else(|_| {
                                            String::from_utf8_lossy(&attr.value).to_string()
                                        });
                                }
                                _ => {}
                            }
                        }
                        if let Some(id) = num_fmt_id {
                            num_fmts.insert(id, format_code);
                        }
                    }
                    b"xf" if in_cell_xfs => cell_xfs.push(Self::xf_num_fmt_id(e)),
                    _ => {}
                },
                Ok(quick_xml::events::Event::End(ref e)) => match e.name().as_ref() {
                    b"numFmts" => in_num_fmts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Ok(quick_xml::events::Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        let formats = cell_xfs
            .into_iter()
            .map(|id| {
                let format = match num_fmts.get(&id) {
                    Some(code) => NumberFormat::new(id, code.as_str()),
                    None => NumberFormat::builtin(id),
                };
                (!format.is_general()).then(|| Arc::new(format))
            })
            .collect();

        Self { formats }
    }

    fn xf_num_fmt_id(e: &quick_xml::events::BytesStart<'_>) -> u32 {
        e.attributes()
            .flatten()
            .find(|attr| attr.key.as_ref() == b"numFmtId")
            .and_then(|attr| String::from_utf8_lossy(&attr.value).parse().ok())
            .unwrap_or(0)
    }

    /// Number format of a cell style index (the `s` attribute).
    ///
    /// `None` means General, also for indexes without a style entry.
    pub fn number_format(&self, style_index: usize) -> Option<&Arc<NumberFormat>> {
        self.formats.get(style_index).and_then(Option::as_ref)
    }
}
