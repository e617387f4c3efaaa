// src/loader.rs
//! Report Loader
//!
//! Retrieves report documents by identifier and extracts the title,
//! metadata pairs, tables (keyed by the nearest preceding heading) and the
//! rendered content region. Retrieval is never retried or cached: every
//! comparison re-fetches both reports.

use crate::config::{CompareConfig, HttpConfig, SelectorConfig};
use crate::models::{OrderedMap, Report, Row, Table};
use async_trait::async_trait;
use log::{debug, info};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a document could not be retrieved
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalFailure {
    /// Server answered with a non-success status
    #[error("（HTTP {0}）")]
    Status(u16),
    /// Request never produced a response
    #[error("：{0}")]
    Transport(String),
}

/// Retrieving a report failed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("無法載入報告 {identifier}{failure}")]
pub struct RetrievalError {
    pub identifier: String,
    pub failure: RetrievalFailure,
}

impl RetrievalError {
    pub fn status(identifier: &str, status: u16) -> Self {
        Self {
            identifier: identifier.to_string(),
            failure: RetrievalFailure::Status(status),
        }
    }

    pub fn transport(identifier: &str, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.to_string(),
            failure: RetrievalFailure::Transport(reason.into()),
        }
    }
}

/// The execution context cannot retrieve documents at all
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{guidance}")]
pub struct UnsupportedContextError {
    pub guidance: String,
}

/// Everything that can abort a comparison
#[derive(Error, Debug)]
pub enum CompareError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    UnsupportedContext(#[from] UnsupportedContextError),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Resolves a report identifier to its HTML document
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<String, RetrievalError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Fetches `{root}/{identifier}.html` over HTTP
pub struct HttpSource {
    client: reqwest::Client,
    root: Url,
}

impl HttpSource {
    pub fn new(root: Url, http: &HttpConfig) -> Result<Self, CompareError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| CompareError::Client(e.to_string()))?;

        Ok(Self { client, root })
    }

    pub fn document_url(&self, identifier: &str) -> Result<Url, RetrievalError> {
        let raw = format!(
            "{}/{}.html",
            self.root.as_str().trim_end_matches('/'),
            identifier
        );
        Url::parse(&raw).map_err(|e| RetrievalError::transport(identifier, e.to_string()))
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn fetch(&self, identifier: &str) -> Result<String, RetrievalError> {
        let url = self.document_url(identifier)?;
        info!("Retrieving report {} from {}", identifier, url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetrievalError::transport(identifier, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RetrievalError::status(identifier, status.as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| RetrievalError::transport(identifier, e.to_string()))
    }

    fn describe(&self) -> String {
        self.root.to_string()
    }
}

/// Reads `{dir}/{identifier}.html` from disk.
///
/// Only built when the caller explicitly opts in to serving local files.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn fetch(&self, identifier: &str) -> Result<String, RetrievalError> {
        let path = self.dir.join(format!("{}.html", identifier));
        info!("Reading report {} from {}", identifier, path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(html),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RetrievalError::status(identifier, 404))
            }
            Err(e) => Err(RetrievalError::transport(identifier, e.to_string())),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// In-memory documents keyed by identifier
#[derive(Default)]
pub struct StaticSource {
    documents: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, identifier: &str, html: &str) -> Self {
        self.documents.insert(identifier.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn fetch(&self, identifier: &str) -> Result<String, RetrievalError> {
        self.documents
            .get(identifier)
            .cloned()
            .ok_or_else(|| RetrievalError::status(identifier, 404))
    }

    fn describe(&self) -> String {
        format!("{} in-memory documents", self.documents.len())
    }
}

/// Guidance shown when reports can only be reached through the file system
pub const LOCAL_CONTEXT_GUIDANCE: &str = "比較功能需要透過 HTTP 伺服器存取。\
請在報告目錄執行 python3 -m http.server 8000 並以 --root http://localhost:8000 重新執行，\
或加上 --allow-local 直接讀取本機檔案。";

/// Pre-parsed selectors for report extraction
pub struct ExtractionRules {
    content: Selector,
    tables: Selector,
    header_cells: Selector,
    body_rows: Selector,
    data_cells: Selector,
    meta_item: Selector,
    meta_label: Selector,
    meta_value: Selector,
    title: Selector,
    title_suffix: String,
}

impl ExtractionRules {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, CompareError> {
        Ok(Self {
            content: parse_selector(&selectors.content)?,
            tables: parse_selector(&selectors.tables)?,
            header_cells: parse_selector(&selectors.header_cells)?,
            body_rows: parse_selector(&selectors.body_rows)?,
            data_cells: parse_selector(&selectors.data_cells)?,
            meta_item: parse_selector(&selectors.meta_item)?,
            meta_label: parse_selector(&selectors.meta_label)?,
            meta_value: parse_selector(&selectors.meta_value)?,
            title: parse_selector("title")?,
            title_suffix: selectors.title_suffix.clone(),
        })
    }

    /// Extract a report from a retrieved document
    pub fn extract(&self, identifier: &str, html: &str) -> Report {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title)
            .next()
            .map(|t| element_text(&t).replacen(&self.title_suffix, "", 1))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| identifier.to_string());

        let content = document
            .select(&self.content)
            .next()
            .map(|c| c.inner_html())
            .unwrap_or_default();

        let mut metadata = OrderedMap::new();
        for item in document.select(&self.meta_item) {
            let label = item.select(&self.meta_label).next().map(|l| element_text(&l));
            let value = item.select(&self.meta_value).next().map(|v| element_text(&v));
            if let (Some(label), Some(value)) = (label, value) {
                if !label.is_empty() && !value.is_empty() {
                    metadata.insert(label, value);
                }
            }
        }

        let mut tables = OrderedMap::new();
        for (index, table) in document.select(&self.tables).enumerate() {
            let key = preceding_heading(&table).unwrap_or_else(|| format!("table_{}", index));
            tables.insert(key, self.extract_table(&table));
        }

        debug!(
            "Extracted report {}: {} tables, {} metadata pairs",
            identifier,
            tables.len(),
            metadata.len()
        );

        Report {
            identifier: identifier.to_string(),
            title,
            content,
            metadata,
            tables,
        }
    }

    /// Headers and data rows of one table; ragged rows are kept as-is
    pub fn extract_table(&self, table: &ElementRef) -> Table {
        let headers: Vec<String> = table
            .select(&self.header_cells)
            .map(|th| element_text(&th))
            .collect();

        let mut rows = Vec::new();
        for tr in table.select(&self.body_rows) {
            let mut row = Row::new();
            for (i, td) in tr.select(&self.data_cells).enumerate() {
                let key = headers.get(i).cloned().unwrap_or_else(|| format!("col{}", i));
                row.insert(key, element_text(&td));
            }
            if !row.is_empty() {
                rows.push(row);
            }
        }

        Table::new(headers, rows)
    }
}

fn parse_selector(raw: &str) -> Result<Selector, CompareError> {
    Selector::parse(raw).map_err(|e| CompareError::InvalidSelector {
        selector: raw.to_string(),
        reason: format!("{:?}", e),
    })
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the nearest preceding sibling heading (h1-h6), if any
fn preceding_heading(el: &ElementRef) -> Option<String> {
    el.prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| is_heading(sib.value().name()))
        .map(|h| element_text(&h))
        .filter(|text| !text.is_empty())
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Loads reports from a document source
pub struct ReportLoader {
    source: Box<dyn DocumentSource>,
    rules: ExtractionRules,
}

impl ReportLoader {
    pub fn new(source: Box<dyn DocumentSource>, config: &CompareConfig) -> Result<Self, CompareError> {
        Ok(Self {
            source,
            rules: ExtractionRules::new(&config.selectors)?,
        })
    }

    /// Pick a source for `root`.
    ///
    /// HTTP(S) roots are fetched over the network. A `file://` URL or a
    /// plain path is only read when `allow_local` is set; otherwise this
    /// fails fast with guidance.
    pub fn for_root(root: &str, allow_local: bool, config: &CompareConfig) -> Result<Self, CompareError> {
        let source: Box<dyn DocumentSource> = match Url::parse(root) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Box::new(HttpSource::new(url, &config.http)?)
            }
            Ok(url) if url.scheme() == "file" => {
                if !allow_local {
                    return Err(unsupported_context());
                }
                let dir = url.to_file_path().map_err(|_| UnsupportedContextError {
                    guidance: format!("無法解析本機路徑：{}", root),
                })?;
                Box::new(DirectorySource::new(dir))
            }
            Ok(url) if url.scheme().len() > 1 => {
                return Err(UnsupportedContextError {
                    guidance: format!("不支援的協定 {}：{}", url.scheme(), LOCAL_CONTEXT_GUIDANCE),
                }
                .into());
            }
            // Plain paths (including Windows drive letters parsed as schemes)
            _ => {
                if !allow_local {
                    return Err(unsupported_context());
                }
                Box::new(DirectorySource::new(root))
            }
        };

        Self::new(source, config)
    }

    pub fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    /// Retrieve and extract one report
    pub async fn load(&self, identifier: &str) -> Result<Report, RetrievalError> {
        let html = self.source.fetch(identifier).await?;
        Ok(self.rules.extract(identifier, &html))
    }

    /// Retrieve both reports concurrently; fails if either fails
    pub async fn load_pair(&self, left: &str, right: &str) -> Result<(Report, Report), RetrievalError> {
        tokio::try_join!(self.load(left), self.load(right))
    }
}

fn unsupported_context() -> CompareError {
    UnsupportedContextError {
        guidance: LOCAL_CONTEXT_GUIDANCE.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><head><title>月報 2024-05 - 保健食品情報系統</title></head>
        <body>
          <div class="report-meta">
            <div class="report-meta-item">
              <span class="report-meta-label">資料期間</span>
              <span class="report-meta-value"> 2024-05 </span>
            </div>
            <div class="report-meta-item">
              <span class="report-meta-label">空值</span>
              <span class="report-meta-value"></span>
            </div>
          </div>
          <div class="md-content">
            <table>
              <thead><tr><th>排名</th><th>成分</th></tr></thead>
              <tbody><tr><td>1</td><td>鈣</td></tr></tbody>
            </table>
            <h3>市場分布</h3>
            <p>說明文字</p>
            <table>
              <thead><tr><th>品名</th><th>US</th><th>合計</th></tr></thead>
              <tbody>
                <tr><td>钙片</td><td>40</td><td>100</td></tr>
                <tr><td>鱼油</td><td>12</td></tr>
                <tr><td>A</td><td>1</td><td>2</td><td>extra</td></tr>
              </tbody>
            </table>
          </div>
        </body></html>
    "#;

    fn rules() -> ExtractionRules {
        ExtractionRules::new(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_title_and_metadata() {
        let report = rules().extract("monthly/2024-05", SAMPLE);

        assert_eq!(report.title, "月報 2024-05");
        assert_eq!(report.metadata.get("資料期間").map(String::as_str), Some("2024-05"));
        assert!(report.metadata.get("空值").is_none());
        assert!(report.content.contains("<table>"));
    }

    #[test]
    fn test_title_falls_back_to_identifier() {
        let report = rules().extract("weekly/01", "<html><body></body></html>");
        assert_eq!(report.title, "weekly/01");
        assert!(report.content.is_empty());
        assert!(report.tables.is_empty());
    }

    #[test]
    fn test_tables_keyed_by_heading_or_position() {
        let report = rules().extract("r", SAMPLE);

        let keys: Vec<_> = report.tables.keys().collect();
        assert_eq!(keys, vec!["table_0", "市場分布"]);
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let report = rules().extract("r", SAMPLE);
        let table = report.tables.get("市場分布").unwrap();

        assert_eq!(table.headers, vec!["品名", "US", "合計"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].get("合計"), None);
        assert_eq!(table.rows[2].get("col3").map(String::as_str), Some("extra"));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let mut selectors = SelectorConfig::default();
        selectors.tables = "table[".to_string();
        assert!(matches!(
            ExtractionRules::new(&selectors),
            Err(CompareError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_file_root_requires_opt_in() {
        let config = CompareConfig::default();

        let err = ReportLoader::for_root("file:///srv/reports", false, &config).err().unwrap();
        assert!(matches!(err, CompareError::UnsupportedContext(_)));

        let err = ReportLoader::for_root("docs/html", false, &config).err().unwrap();
        assert!(matches!(err, CompareError::UnsupportedContext(_)));

        assert!(ReportLoader::for_root("docs/html", true, &config).is_ok());
    }

    #[test]
    fn test_retrieval_error_message() {
        let err = RetrievalError::status("monthly/2024-05", 404);
        assert_eq!(err.to_string(), "無法載入報告 monthly/2024-05（HTTP 404）");

        let err = RetrievalError::transport("monthly/2024-05", "connection refused");
        assert_eq!(err.to_string(), "無法載入報告 monthly/2024-05：connection refused");
    }

    /// Serve one canned HTTP response on a local port
    async fn serve_once(response: &'static str) -> Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        });

        Url::parse(&format!("http://{}/reports/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let root = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let source = HttpSource::new(root, &HttpConfig::default()).unwrap();

        let err = source.fetch("monthly/2024-05").await.unwrap_err();

        assert_eq!(err.identifier, "monthly/2024-05");
        assert_eq!(err.failure, RetrievalFailure::Status(500));
    }

    #[tokio::test]
    async fn test_http_success_returns_body() {
        let root = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<p>report</p>",
        )
        .await;
        let source = HttpSource::new(root, &HttpConfig::default()).unwrap();

        let html = source.fetch("monthly/2024-05").await.unwrap();

        assert_eq!(html, "<p>report</p>");
    }

    #[tokio::test]
    async fn test_http_connection_failure_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let root = Url::parse(&format!("http://{}/", addr)).unwrap();
        let source = HttpSource::new(root, &HttpConfig::default()).unwrap();

        let err = source.fetch("monthly/2024-05").await.unwrap_err();

        assert_eq!(err.identifier, "monthly/2024-05");
        assert!(matches!(err.failure, RetrievalFailure::Transport(_)));
    }

    #[tokio::test]
    async fn test_load_pair_fails_if_either_fails() {
        let source = StaticSource::new().with_document("a", SAMPLE);
        let loader = ReportLoader::new(Box::new(source), &CompareConfig::default()).unwrap();

        let err = loader.load_pair("a", "missing").await.unwrap_err();
        assert_eq!(err.identifier, "missing");
        assert_eq!(err.failure, RetrievalFailure::Status(404));
    }

    #[test]
    fn test_http_document_url() {
        let root = Url::parse("http://localhost:8000/reports/").unwrap();
        let source = HttpSource::new(root, &HttpConfig::default()).unwrap();

        let url = source.document_url("monthly/2024-05").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/reports/monthly/2024-05.html");
    }
}
