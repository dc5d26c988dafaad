//! Lightweight PDF inspection
//!
//! Reads the page tree count, the first media box and the info dictionary strings
//! straight from the file body. Compressed object streams are not inflated, so the
//! optional fields may be missing for such files.

use hydra_core::PdfMeta;
use regex::bytes::Regex;

use super::ConvertError;

const PDF_MAGIC: &[u8] = b"%PDF-";

fn regex(pattern: &str) -> Result<Regex, ConvertError> {
    Regex::new(pattern).map_err(|e| ConvertError::Task(format!("invalid pattern: {}", e)))
}

fn info_string(data: &[u8], key: &str) -> Result<Option<String>, ConvertError> {
    let re = regex(&format!(r"/{}\s*\(([^)]*)\)", key))?;
    Ok(re
        .captures(data)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
        .filter(|s| !s.is_empty()))
}

pub(crate) fn parse_pdf(data: &[u8]) -> Result<PdfMeta, ConvertError> {
    if !data.starts_with(PDF_MAGIC) {
        return Err(ConvertError::InvalidMedia(
            "missing %PDF- header".to_string(),
        ));
    }

    // The root Pages node carries the largest /Count
    let count_re = regex(r"/Count\s+(\d+)")?;
    let page_count = count_re
        .captures_iter(data)
        .filter_map(|c| c.get(1))
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok()?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);

    let box_re = regex(
        r"/MediaBox\s*\[\s*(-?[\d.]+)\s+(-?[\d.]+)\s+(-?[\d.]+)\s+(-?[\d.]+)\s*\]",
    )?;
    let (width, height) = match box_re.captures(data) {
        Some(caps) => {
            let coords: Vec<f64> = (1..=4)
                .filter_map(|i| caps.get(i))
                .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok()?.parse::<f64>().ok())
                .collect();
            if coords.len() == 4 {
                (
                    Some((coords[2] - coords[0]).abs().round() as u32),
                    Some((coords[3] - coords[1]).abs().round() as u32),
                )
            } else {
                (None, None)
            }
        }
        None => (None, None),
    };

    Ok(PdfMeta {
        page_count,
        width,
        height,
        title: info_string(data, "Title")?,
        author: info_string(data, "Author")?,
    })
}
