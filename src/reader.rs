//! Streaming reader for location export documents.
//!
//! The document is one JSON object whose `locations` key holds an array of
//! records. Exports run to hundreds of megabytes, so the array is never
//! materialised: a blocking worker walks the document with `serde_json`
//! and hands records one by one over a bounded channel. The channel capacity
//! is the read-ahead; when the pipeline falls behind, the worker waits.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserializer as _;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::chain::Source;
use crate::records::RawRecord;

const LOCATIONS_KEY: &str = "locations";

/// Default number of records parsed ahead of the pipeline.
pub const DEFAULT_READ_AHEAD: usize = 1000;

/// Lazy, finite sequence of raw records read from a document.
pub struct RecordStream {
    rx: mpsc::Receiver<RawRecord>,
    worker: Option<JoinHandle<Result<usize>>>,
}

impl RecordStream {
    /// Opens `path` and starts parsing it in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened. Parse errors surface
    /// later, from [`Source::next`].
    pub fn open(path: impl AsRef<Path>, read_ahead: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open location records at {}", path.display()))?;
        debug!(path = %path.display(), read_ahead, "Streaming location records");
        Ok(Self::from_reader(BufReader::new(file), read_ahead))
    }

    /// Streams records out of any reader.
    pub fn from_reader<R>(reader: R, read_ahead: usize) -> Self
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(read_ahead.max(1));
        let worker = tokio::task::spawn_blocking(move || stream_locations(reader, &tx));
        Self {
            rx,
            worker: Some(worker),
        }
    }
}

#[async_trait]
impl Source for RecordStream {
    type Item = RawRecord;

    async fn next(&mut self) -> Result<Option<RawRecord>> {
        if let Some(record) = self.rx.recv().await {
            return Ok(Some(record));
        }

        // Channel closed: the worker is done, report how it ended.
        if let Some(worker) = self.worker.take() {
            let forwarded = worker
                .await
                .map_err(|e| anyhow!("record reader task failed: {e}"))??;
            debug!(records = forwarded, "Location records exhausted");
        }
        Ok(None)
    }
}

fn stream_locations<R: Read>(reader: R, tx: &mpsc::Sender<RawRecord>) -> Result<usize> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let forwarded = (&mut de)
        .deserialize_map(DocumentVisitor { tx })
        .context("malformed location records document")?;
    de.end().context("trailing data after location records document")?;
    Ok(forwarded)
}

/// Walks the top-level object, streaming only the `locations` array.
struct DocumentVisitor<'a> {
    tx: &'a mpsc::Sender<RawRecord>,
}

impl<'de> Visitor<'de> for DocumentVisitor<'_> {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an object with a `{LOCATIONS_KEY}` array")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<usize, A::Error> {
        let mut forwarded = 0;
        while let Some(key) = map.next_key::<String>()? {
            if key == LOCATIONS_KEY {
                forwarded += map.next_value_seed(Locations { tx: self.tx })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(forwarded)
    }
}

struct Locations<'a> {
    tx: &'a mpsc::Sender<RawRecord>,
}

impl<'de> DeserializeSeed<'de> for Locations<'_> {
    type Value = usize;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<usize, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for Locations<'_> {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of location records")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<usize, A::Error> {
        let mut forwarded = 0;
        while let Some(record) = seq.next_element::<RawRecord>()? {
            self.tx
                .blocking_send(record)
                .map_err(|_| <A::Error as de::Error>::custom("record consumer stopped reading"))?;
            forwarded += 1;
        }
        Ok(forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use serde_json::json;
    use std::io::Cursor;

    async fn read_all(doc: &str) -> Result<Vec<RawRecord>> {
        let stream = RecordStream::from_reader(Cursor::new(doc.to_string()), 2);
        Chain::new(stream).collect().await
    }

    #[tokio::test]
    async fn test_reads_locations_in_order() {
        let doc = r#"{"locations": [{"n": 1}, {"n": 2}, {"n": 3}, {"n": 4}, {"n": 5}]}"#;
        let records = read_all(doc).await.unwrap();

        let ns: Vec<_> = records.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_other_keys_are_skipped() {
        let doc = r#"{"meta": {"locations": [0]}, "locations": [{"n": 1}], "tail": [1, 2]}"#;
        let records = read_all(doc).await.unwrap();

        assert_eq!(records, vec![json!({"n": 1})]);
    }

    #[tokio::test]
    async fn test_missing_locations_key_is_empty() {
        let records = read_all(r#"{"other": []}"#).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_elements_pass_through() {
        let records = read_all(r#"{"locations": [1, null, "x"]}"#).await.unwrap();
        assert_eq!(records, vec![json!(1), json!(null), json!("x")]);
    }

    #[tokio::test]
    async fn test_malformed_document_is_fatal() {
        assert!(read_all(r#"{"locations": [{"n": 1}, {"n": "#).await.is_err());
        assert!(read_all(r#"[{"n": 1}]"#).await.is_err());
        assert!(read_all(r#"{"locations": {"n": 1}}"#).await.is_err());
        assert!(read_all(r#"{"locations": []} garbage"#).await.is_err());
    }

    #[tokio::test]
    async fn test_records_before_syntax_error_are_delivered() {
        let doc = r#"{"locations": [{"n": 1}, oops]}"#;
        let mut stream = RecordStream::from_reader(Cursor::new(doc), 4);

        let first = stream.next().await.unwrap();
        assert_eq!(first, Some(json!({"n": 1})));
        assert!(stream.next().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = RecordStream::open("/nonexistent/records.json", 10);
        assert!(result.is_err());
    }
}
