use feedboard::feed::{FeedEntry, FeedSource, FetchError};
use feedboard::model::types::{Item, Resource};
use feedboard::storage::{Database, PersistenceGateway, Table};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: std::sync::Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// In-memory feeds keyed by the URL the syncer requests.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubFeeds {
    feeds: HashMap<String, Vec<FeedEntry>>,
    failing: HashMap<String, String>,
    pub requested: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl StubFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(mut self, url: &str, entries: &[(&str, &str)]) -> Self {
        self.feeds.insert(
            url.to_string(),
            entries
                .iter()
                .map(|(title, link)| FeedEntry::new(*title, *link))
                .collect(),
        );
        self
    }

    pub fn failing(mut self, url: &str, reason: &str) -> Self {
        self.failing.insert(url.to_string(), reason.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl FeedSource for StubFeeds {
    fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FetchError> {
        self.requested.borrow_mut().push(url.to_string());
        if let Some(reason) = self.failing.get(url) {
            return Err(FetchError::Parse(reason.clone()));
        }
        Ok(self.feeds.get(url).cloned().unwrap_or_default())
    }
}

#[allow(dead_code)]
pub fn board(resources: Vec<Resource>, items: Vec<Item>) -> Database {
    Database::new(
        Table::from_records(resources).expect("unique resources"),
        Table::from_records(items).expect("unique items"),
    )
}

/// A board saved to a temp dir, with the gateway that wrote it.
#[allow(dead_code)]
pub struct SavedBoard {
    pub dir: TempDir,
    pub gateway: PersistenceGateway,
}

#[allow(dead_code)]
impl SavedBoard {
    pub fn write(db: &Database) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let gateway = PersistenceGateway::for_path(dir.path().join("board.json")).expect("json");
        gateway.save(db).expect("save fixture");
        Self { dir, gateway }
    }

    pub fn path(&self) -> PathBuf {
        self.gateway.path().to_path_buf()
    }

    pub fn reload(&self) -> Database {
        self.gateway.load().expect("reload")
    }
}
