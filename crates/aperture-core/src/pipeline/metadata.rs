//! EXIF metadata extraction from stored image files.

use exif::{In, Reader};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Extracts embedded capture metadata from image files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract EXIF attributes as a `tag name -> stringified value` map.
    ///
    /// Intentionally fault-tolerant: a missing or corrupt EXIF segment
    /// yields an empty map, never an error. The pipeline treats embedded
    /// metadata as best-effort.
    pub fn extract(path: &Path) -> BTreeMap<String, String> {
        match Self::try_extract(path) {
            Ok(map) => map,
            Err(exif::Error::NotFound(_)) => {
                tracing::debug!(path = %path.display(), "no EXIF data present");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "EXIF extraction failed");
                BTreeMap::new()
            }
        }
    }

    fn try_extract(path: &Path) -> Result<BTreeMap<String, String>, exif::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut reader)?;

        let mut map = BTreeMap::new();
        for field in exif.fields() {
            if field.ifd_num != In::PRIMARY {
                continue;
            }
            let value = field
                .display_value()
                .with_unit(&exif)
                .to_string()
                .trim_matches('"')
                .to_string();
            map.insert(field.tag.to_string(), value);
        }
        Ok(map)
    }
}
