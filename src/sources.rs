//! URL list input
//!
//! A URL list is a text file with one `<id> <url>` entry per line, separated by whitespace.
//! Blank lines and lines starting with `#` are ignored. Extra fields after the URL are
//! ignored too, which allows annotated lists.
//!
//! ```text
//! # id      url
//! n0001     http://images.example.com/cats/1.jpg
//! n0002     http://images.example.com/cats/2.png   source=crawl-7
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{BehaviorFlags, WorkItem};

/// One parsed line of a URL list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlEntry {
    /// Logical id; names the produced files
    pub id: String,
    /// Address to fetch
    pub url: String,
}

impl UrlEntry {
    /// Turn the entry into a work item writing into `output_dir`
    pub fn into_work_item(self, output_dir: &Path, flags: BehaviorFlags) -> Result<WorkItem> {
        Ok(WorkItem::new(self.id, self.url, output_dir)?.with_flags(flags))
    }
}

/// Read entries from a URL list
///
/// The first `skip` entries are passed over without being parsed, then at most `limit`
/// entries are returned (all remaining ones when `None`). Reading stops as soon as the limit
/// is reached.
pub fn read_url_list<R: BufRead>(
    reader: R,
    skip: usize,
    limit: Option<usize>,
) -> Result<Vec<UrlEntry>> {
    let mut entries = Vec::new();
    let mut skipped = 0;

    for (index, line) in reader.lines().enumerate() {
        if limit.is_some_and(|limit| entries.len() >= limit) {
            break;
        }

        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if skipped < skip {
            skipped += 1;
            continue;
        }

        entries.push(parse_line(trimmed, index + 1)?);
    }

    tracing::debug!(entries = entries.len(), skipped, "url list read");
    Ok(entries)
}

/// Read entries from a URL list file
pub fn load_url_list(path: &Path, skip: usize, limit: Option<usize>) -> Result<Vec<UrlEntry>> {
    let file = File::open(path)?;
    let entries = read_url_list(BufReader::new(file), skip, limit)?;
    tracing::info!(
        path = %path.display(),
        entries = entries.len(),
        skip,
        "loaded url list"
    );
    Ok(entries)
}

fn parse_line(line: &str, line_number: usize) -> Result<UrlEntry> {
    let mut fields = line.split_whitespace();
    let (Some(id), Some(url)) = (fields.next(), fields.next()) else {
        return Err(Error::InvalidInput {
            line: line_number,
            reason: format!("expected '<id> <url>', got '{}'", line),
        });
    };

    Ok(UrlEntry {
        id: id.to_string(),
        url: url.to_string(),
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const LIST: &str = "\
# image list
n01 http://example.com/1.jpg

n02\thttp://example.com/2.png  crawl=7
n03 http://example.com/3.gif
n04 http://example.com/4.jpg
";

    #[test]
    fn parses_entries_and_ignores_comments_and_blanks() {
        let entries = read_url_list(Cursor::new(LIST), 0, None).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["n01", "n02", "n03", "n04"]);
        assert_eq!(entries[1].url, "http://example.com/2.png");
    }

    #[test]
    fn skip_and_limit_select_a_window() {
        let entries = read_url_list(Cursor::new(LIST), 1, Some(2)).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["n02", "n03"]);
    }

    #[test]
    fn limit_zero_reads_nothing() {
        assert!(read_url_list(Cursor::new(LIST), 0, Some(0)).unwrap().is_empty());
    }

    #[test]
    fn skipping_past_the_end_is_empty() {
        assert!(read_url_list(Cursor::new(LIST), 10, None).unwrap().is_empty());
    }

    #[test]
    fn line_without_url_reports_its_line_number() {
        let input = "a http://example.com/a\nb\n";
        match read_url_list(Cursor::new(input), 0, None) {
            Err(Error::InvalidInput { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("'b'"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_lines_inside_the_skipped_window_are_not_parsed() {
        let input = "broken\nok http://example.com/ok\n";
        let entries = read_url_list(Cursor::new(input), 1, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "ok");
    }

    #[test]
    fn malformed_lines_past_the_limit_are_not_parsed() {
        let input = "ok http://example.com/ok\nbroken\n";
        let entries = read_url_list(Cursor::new(input), 0, Some(1)).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn load_reads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LIST.as_bytes()).unwrap();

        let entries = load_url_list(file.path(), 0, Some(3)).unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_url_list(Path::new("/definitely/not/here.txt"), 0, None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn entry_converts_into_work_item() {
        let entry = UrlEntry {
            id: "n01".into(),
            url: "http://example.com/1.jpg".into(),
        };
        let flags = BehaviorFlags {
            save_original: true,
            ..Default::default()
        };

        let item = entry.into_work_item(Path::new("out"), flags).unwrap();
        assert_eq!(item.id(), "n01");
        assert_eq!(item.output_dir(), Path::new("out"));
        assert!(item.flags().save_original);
    }

    #[test]
    fn entry_with_path_like_id_is_rejected() {
        let entry = UrlEntry {
            id: "../escape".into(),
            url: "http://example.com/1.jpg".into(),
        };
        assert!(matches!(
            entry.into_work_item(Path::new("out"), BehaviorFlags::default()),
            Err(Error::InvalidItem(_))
        ));
    }
}
