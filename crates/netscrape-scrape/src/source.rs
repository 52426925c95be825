//! Paged record sources.

use crate::error::SourceError;
use crate::record::StarredRepo;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Which page to fetch. `cursor` is `None` for the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub per_page: usize,
}

/// One page of records and the cursor of the next page, `None` on the last.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub next: Option<String>,
}

/// A paged listing, read page by page until `next` is `None`.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Record: Send + 'static;

    async fn fetch_page(&self, request: PageRequest) -> Result<Page<Self::Record>, SourceError>;
}

fn parse_offset(cursor: Option<&str>) -> Result<usize, SourceError> {
    match cursor {
        None => Ok(0),
        Some(c) => c.parse().map_err(|_| SourceError::Cursor(c.to_string())),
    }
}

/// Pre-built pages served verbatim, whatever `per_page` asks for.
#[derive(Debug, Clone)]
pub struct StaticPages<R> {
    pages: Vec<Vec<R>>,
}

impl<R> StaticPages<R> {
    pub fn new(pages: Vec<Vec<R>>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> PageSource for StaticPages<R> {
    type Record = R;

    async fn fetch_page(&self, request: PageRequest) -> Result<Page<R>, SourceError> {
        let index = parse_offset(request.cursor.as_deref())?;
        if self.pages.is_empty() && index == 0 {
            return Ok(Page {
                records: Vec::new(),
                next: None,
            });
        }
        let records = self
            .pages
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::Cursor(index.to_string()))?;
        let next = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(Page { records, next })
    }
}

/// Records read from a JSON array on disk, re-chunked to `per_page`.
#[derive(Debug, Clone)]
pub struct JsonFileSource<R = StarredRepo> {
    path: PathBuf,
    records: Vec<R>,
}

impl<R: DeserializeOwned> JsonFileSource<R> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let records: Vec<R> = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.display(), records = records.len(), "page file loaded");
        Ok(Self { path, records })
    }
}

impl<R> JsonFileSource<R> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> PageSource for JsonFileSource<R> {
    type Record = R;

    async fn fetch_page(&self, request: PageRequest) -> Result<Page<R>, SourceError> {
        let offset = parse_offset(request.cursor.as_deref())?;
        if offset > self.records.len() {
            return Err(SourceError::Cursor(offset.to_string()));
        }
        let end = offset.saturating_add(request.per_page.max(1)).min(self.records.len());
        let next = (end < self.records.len()).then(|| end.to_string());
        Ok(Page {
            records: self.records[offset..end].to_vec(),
            next,
        })
    }
}
