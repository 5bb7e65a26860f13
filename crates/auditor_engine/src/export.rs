use std::path::{Path, PathBuf};

use auditor_logging::auditor_info;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::persist::{AtomicFileWriter, PersistError};
use crate::BrokenLink;

/// Name of the exported report.
pub const CSV_FILENAME: &str = "broken_links.csv";
/// Media type of the exported report.
pub const CSV_MIME: &str = "text/csv;charset=utf-8";

const CSV_HEADER: &str = "#,Broken Link,Link Text,Page Found,Status";
const LINK_TEXT_PLACEHOLDER: &str = "N/A";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("report is not valid utf-8: {0}")]
    Encoding(String),
}

/// Renders the report: a plain header line, then one fully quoted row per link.
pub fn broken_links_csv(links: &[BrokenLink]) -> Result<String, ExportError> {
    let mut out = Vec::with_capacity(CSV_HEADER.len() + 1 + links.len() * 96);
    out.extend_from_slice(CSV_HEADER.as_bytes());
    out.push(b'\n');

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out);
    for (i, link) in links.iter().enumerate() {
        let index = (i + 1).to_string();
        let link_text = link
            .link_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(LINK_TEXT_PLACEHOLDER);
        let status = link
            .status_code
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        writer.write_record([
            index.as_str(),
            link.link.as_str(),
            link_text,
            link.page_url.as_str(),
            status.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    String::from_utf8(bytes).map_err(|err| ExportError::Encoding(err.to_string()))
}

/// Writes `broken_links.csv` into `dir` and returns its path.
pub fn export_broken_links(dir: &Path, links: &[BrokenLink]) -> Result<PathBuf, ExportError> {
    let content = broken_links_csv(links)?;
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let path = writer.write(CSV_FILENAME, content.as_bytes())?;
    auditor_info!(
        "Exported {} broken links to {:?} as {}",
        links.len(),
        path,
        CSV_MIME
    );
    Ok(path)
}
