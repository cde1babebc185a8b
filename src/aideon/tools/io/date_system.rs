//! Reads the workbook-level 1904 flag.
//!
//! calamine honours the flag internally but does not report it, so the
//! reader looks it up again to know which epoch the sheet's serials were
//! saved against.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use tracing::{debug, instrument};
use zip::ZipArchive;

use crate::aideon::tools::error::Result;
use crate::aideon::tools::model::DateMode;

/// `BrtWbProp`, the binary workbook properties record.
const BRT_WB_PROP: u16 = 0x0099;

/// Date system a workbook was saved with.
///
/// The flag is read from `xl/workbook.xml` for xlsx-family files and from
/// `xl/workbook.bin` for xlsb. Other formats, and workbooks that carry no
/// flag, are reported as the 1900 system.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn detect_date_mode(path: &Path) -> Result<DateMode> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);

    let flag = match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xlam") => xlsx_flag(&read_part(path, "xl/workbook.xml")?[..])?,
        Some("xlsb") => xlsb_flag(&read_part(path, "xl/workbook.bin")?[..])?,
        _ => None,
    };

    let mode = flag.and_then(DateMode::from_flag).unwrap_or_default();
    debug!(flag = ?flag, date1904 = mode.flag(), "detected date system");
    Ok(mode)
}

fn read_part(path: &Path, name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    let mut bytes = Vec::new();
    archive.by_name(name)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Flag from the `date1904` attribute of `<workbookPr>`, if the element is
/// present.
pub fn xlsx_flag<R: BufRead>(xml: R) -> Result<Option<u8>> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.expand_empty_elements(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) if element.local_name().as_ref() == b"workbookPr" => {
                let set = match element
                    .try_get_attribute("date1904")
                    .map_err(quick_xml::Error::from)?
                {
                    Some(attribute) => matches!(&*attribute.unescape_value()?, "1" | "true"),
                    None => false,
                };
                return Ok(Some(u8::from(set)));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Flag from the first bit of the `BrtWbProp` record, if the record is
/// present.
pub fn xlsb_flag<R: Read>(mut records: R) -> Result<Option<u8>> {
    while let Some(record_type) = read_record_type(&mut records)? {
        let len = read_record_len(&mut records)?;
        let mut body = vec![0; len];
        records.read_exact(&mut body)?;
        if record_type == BRT_WB_PROP {
            return Ok(body.first().map(|flags| flags & 0x1));
        }
    }
    Ok(None)
}

fn read_byte<R: Read>(reader: &mut R) -> Result<Option<u8>> {
    let mut byte = [0; 1];
    match reader.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

fn required_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

// Record types are one or two bytes, seven bits each.
fn read_record_type<R: Read>(reader: &mut R) -> Result<Option<u16>> {
    let Some(low) = read_byte(reader)? else {
        return Ok(None);
    };
    if low & 0x80 == 0 {
        return Ok(Some(u16::from(low)));
    }
    let high = required_byte(reader)?;
    Ok(Some(u16::from(low & 0x7F) | (u16::from(high & 0x7F) << 7)))
}

// Record lengths take up to four bytes, seven bits each.
fn read_record_len<R: Read>(reader: &mut R) -> Result<usize> {
    let mut len = 0usize;
    for shift in [0, 7, 14, 21] {
        let byte = required_byte(reader)?;
        len |= usize::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_xlsx_flag() {
        let flagged = br#"<workbook><workbookPr date1904="1" defaultThemeVersion="124226"/></workbook>"#;
        let spelled = br#"<workbook><workbookPr date1904="true"></workbookPr></workbook>"#;
        let cleared = br#"<workbook><workbookPr date1904="0"/></workbook>"#;
        let plain = br#"<workbook><workbookPr defaultThemeVersion="124226"/></workbook>"#;

        assert_eq!(xlsx_flag(&flagged[..]).expect("parsed"), Some(1));
        assert_eq!(xlsx_flag(&spelled[..]).expect("parsed"), Some(1));
        assert_eq!(xlsx_flag(&cleared[..]).expect("parsed"), Some(0));
        assert_eq!(xlsx_flag(&plain[..]).expect("parsed"), Some(0));
    }

    #[test]
    fn missing_workbook_properties_have_no_flag() {
        let xml = br#"<workbook><sheets/></workbook>"#;
        assert_eq!(xlsx_flag(&xml[..]).expect("parsed"), None);
    }

    #[test]
    fn reads_the_xlsb_flag() {
        let records = [
            0x83u8, 0x01, 0x00, // BrtBeginBook, empty
            0x80, 0x01, 0x02, 0xAA, 0xBB, // BrtFileVersion, two byte body
            0x99, 0x01, 0x04, 0x01, 0x00, 0x00, 0x00, // BrtWbProp, date1904 set
        ];
        assert_eq!(xlsb_flag(&records[..]).expect("parsed"), Some(1));

        let cleared = [0x99u8, 0x01, 0x04, 0x08, 0x00, 0x00, 0x00];
        assert_eq!(xlsb_flag(&cleared[..]).expect("parsed"), Some(0));
    }

    #[test]
    fn xlsb_without_properties_has_no_flag() {
        let records = [0x83u8, 0x01, 0x00];
        assert_eq!(xlsb_flag(&records[..]).expect("parsed"), None);
    }

    #[test]
    fn long_record_lengths_are_decoded() {
        let mut records = vec![0x01u8, 0x81, 0x01];
        records.extend(std::iter::repeat(0).take(129));
        records.extend([0x99, 0x01, 0x01, 0x01]);
        assert_eq!(xlsb_flag(&records[..]).expect("parsed"), Some(1));
    }

    #[test]
    fn formats_without_a_flag_use_the_1900_system() {
        let mode = detect_date_mode(Path::new("book.ods")).expect("no file needed");
        assert_eq!(mode, DateMode::Excel1900);
    }
}
