//! Pipeline runner
//!
//! One `Pipeline` is shared by every request. Storage sits behind a std
//! mutex that is never held across an await point.

use crate::config::{Config, ExtractionConfig};
use crate::enhance::ContentEnhancer;
use crate::extract::{classify_source, ContentKind, ExtractedItem, Extractor};
use crate::pdf::{self, PdfChapter};
use crate::pipeline::{PdfRequest, PipelineOutcome, ProgressEvent, ProgressReporter, UrlRequest};
use crate::state::Progress;
use crate::storage::{
    ItemRecord, JobRecord, NewItem, NewJob, SourceType, SqliteStorage, Storage, StorageResult,
};
use crate::url::{freshness_key, normalize_url};
use crate::IngestError;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use url::Url;

/// Progress checkpoints
const STARTED: u8 = 10;
const DISPATCHED: u8 = 25;
const EXTRACTED: u8 = 40;
const ENHANCED: u8 = 85;
const PERSISTED: u8 = 90;

/// An item waiting for enhancement, with its page range for PDF chapters
struct PendingItem {
    item: ExtractedItem,
    pages: Option<(u32, u32)>,
}

impl From<ExtractedItem> for PendingItem {
    fn from(item: ExtractedItem) -> Self {
        Self { item, pages: None }
    }
}

impl From<PdfChapter> for PendingItem {
    fn from(chapter: PdfChapter) -> Self {
        Self {
            pages: Some((chapter.page_start, chapter.page_end)),
            item: ExtractedItem {
                title: chapter.title,
                content: chapter.content,
                author: None,
                content_kind: ContentKind::Chapter,
            },
        }
    }
}

/// Runs ingestion requests against shared storage
pub struct Pipeline {
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: Extractor,
    enhancer: ContentEnhancer,
    freshness_days: u32,
    step_delay: Duration,
}

impl Pipeline {
    /// Creates a pipeline from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Ready to run requests
    /// * `Err(IngestError)` - An HTTP client could not be built
    pub fn new(config: &Config, storage: Arc<Mutex<SqliteStorage>>) -> Result<Self, IngestError> {
        let extractor = Extractor::new(&config.extraction)?;
        let enhancer = ContentEnhancer::from_config(&config.enhancer)?;
        Ok(Self::from_parts(storage, extractor, enhancer, &config.extraction))
    }

    /// Creates a pipeline from already-built parts
    pub fn from_parts(
        storage: Arc<Mutex<SqliteStorage>>,
        extractor: Extractor,
        enhancer: ContentEnhancer,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            storage,
            extractor,
            enhancer,
            freshness_days: config.freshness_days,
            step_delay: Duration::from_millis(config.step_delay_ms),
        }
    }

    /// Shared handle to the pipeline's storage
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }

    /// Returns true if items go through the text-generation API
    pub fn ai_enabled(&self) -> bool {
        self.enhancer.uses_ai()
    }

    /// Runs `f` with the storage lock held
    fn with_storage<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    ) -> Result<T, IngestError> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| IngestError::Storage("storage lock poisoned".to_string()))?;
        Ok(f(&mut storage)?)
    }

    async fn pause(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }

    /// Ingests a URL, reporting progress on `events`
    ///
    /// # Flow
    ///
    /// 1. Normalize the URL (invalid → `error`, no job created)
    /// 2. Reuse a completed job for the same team and URL within the
    ///    freshness window (→ `complete` with `cached: true`, no new job)
    /// 3. Create and start a job, then dispatch, extract, enhance, persist
    /// 4. Any failure after job creation marks the job failed
    ///
    /// Exactly one terminal event is sent.
    pub async fn run_url(
        &self,
        request: UrlRequest,
        events: Sender<ProgressEvent>,
    ) -> PipelineOutcome {
        let mut reporter = ProgressReporter::new(events);

        let url = match normalize_url(&request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::info!("Rejected URL '{}': {}", request.url, e);
                return Self::finish(&mut reporter, Self::failed(None, e.to_string())).await;
            }
        };
        let source_key = freshness_key(&url);

        match self.find_fresh(&request.team_id, &source_key) {
            Ok(Some((job, items))) => {
                tracing::info!(
                    "Reusing job {} for {} ({} items)",
                    job.id,
                    url,
                    items.len()
                );
                let outcome = PipelineOutcome::Completed {
                    job_id: job.id,
                    items,
                    cached: true,
                };
                return Self::finish(&mut reporter, outcome).await;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Freshness lookup failed for {}: {}", url, e);
                return Self::finish(&mut reporter, Self::failed(None, e.to_string())).await;
            }
        }

        let new_job = NewJob {
            team_id: request.team_id.clone(),
            source_type: SourceType::Url,
            source_ref: url.to_string(),
            source_key: Some(source_key),
        };
        let job = match self.with_storage(|s| s.create_job(&new_job)) {
            Ok(job) => job,
            Err(e) => {
                return Self::finish(&mut reporter, Self::failed(None, e.to_string())).await;
            }
        };
        tracing::info!("Job {} created for {}", job.id, url);

        let result = self.process_url(&job, &url, &mut reporter).await;
        let outcome = self.conclude(&job, result, &mut reporter).await;
        Self::finish(&mut reporter, outcome).await
    }

    /// Ingests an uploaded PDF, reporting progress on `events`
    ///
    /// Uploads are always processed; the freshness window does not apply.
    pub async fn run_pdf(
        &self,
        request: PdfRequest,
        events: Sender<ProgressEvent>,
    ) -> PipelineOutcome {
        let mut reporter = ProgressReporter::new(events);

        let filename = request.filename.trim();
        if filename.is_empty() {
            return Self::finish(
                &mut reporter,
                Self::failed(None, "Missing filename".to_string()),
            )
            .await;
        }

        let new_job = NewJob {
            team_id: request.team_id.clone(),
            source_type: SourceType::Pdf,
            source_ref: format!("pdf:{}", filename),
            source_key: None,
        };
        let job = match self.with_storage(|s| s.create_job(&new_job)) {
            Ok(job) => job,
            Err(e) => {
                return Self::finish(&mut reporter, Self::failed(None, e.to_string())).await;
            }
        };
        tracing::info!(
            "Job {} created for {} ({} bytes)",
            job.id,
            job.source_ref,
            request.bytes.len()
        );

        let result = self.process_pdf(&job, request.bytes, &mut reporter).await;
        let outcome = self.conclude(&job, result, &mut reporter).await;
        Self::finish(&mut reporter, outcome).await
    }

    async fn process_url(
        &self,
        job: &JobRecord,
        url: &Url,
        reporter: &mut ProgressReporter,
    ) -> Result<Vec<ItemRecord>, IngestError> {
        self.start(job, reporter).await?;

        self.pause().await;
        let kind = classify_source(url);
        self.with_storage(|s| s.set_job_source_kind(&job.id, kind.as_str()))?;
        tracing::debug!("Job {} dispatched as {}", job.id, kind);
        self.step(job, reporter, DISPATCHED, format!("Detected {} source", kind))
            .await?;

        self.pause().await;
        let items = self.extractor.extract(kind, url).await;
        if items.is_empty() {
            return Err(IngestError::EmptyExtraction {
                source_ref: job.source_ref.clone(),
            });
        }
        self.step(
            job,
            reporter,
            EXTRACTED,
            format!("Extracted {} item(s)", items.len()),
        )
        .await?;

        let pending = items.into_iter().map(PendingItem::from).collect();
        self.enhance_and_store(job, pending, reporter).await
    }

    async fn process_pdf(
        &self,
        job: &JobRecord,
        bytes: Vec<u8>,
        reporter: &mut ProgressReporter,
    ) -> Result<Vec<ItemRecord>, IngestError> {
        self.start(job, reporter).await?;

        self.pause().await;
        let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes))
            .await??;
        self.with_storage(|s| s.set_job_source_kind(&job.id, "pdf"))?;
        self.step(job, reporter, DISPATCHED, format!("Read {} page(s)", pages.len()))
            .await?;

        self.pause().await;
        let chapters: Vec<PdfChapter> = pdf::detect_chapters(&pages)
            .into_iter()
            .filter(|chapter| !chapter.content.trim().is_empty())
            .collect();
        if chapters.is_empty() {
            return Err(IngestError::EmptyExtraction {
                source_ref: job.source_ref.clone(),
            });
        }
        self.step(
            job,
            reporter,
            EXTRACTED,
            format!("Detected {} chapter(s)", chapters.len()),
        )
        .await?;

        let pending = chapters.into_iter().map(PendingItem::from).collect();
        self.enhance_and_store(job, pending, reporter).await
    }

    async fn start(&self, job: &JobRecord, reporter: &mut ProgressReporter) -> Result<(), IngestError> {
        self.with_storage(|s| s.start_job(&job.id))?;
        self.step(job, reporter, STARTED, "Job started").await
    }

    /// Records progress in storage, then reports it
    async fn step(
        &self,
        job: &JobRecord,
        reporter: &mut ProgressReporter,
        value: u8,
        message: impl Into<String>,
    ) -> Result<(), IngestError> {
        let stored = self.with_storage(|s| s.update_job_progress(&job.id, Progress::new(value)))?;
        reporter.report(Some(&job.id), stored.value(), message).await;
        Ok(())
    }

    async fn enhance_and_store(
        &self,
        job: &JobRecord,
        pending: Vec<PendingItem>,
        reporter: &mut ProgressReporter,
    ) -> Result<Vec<ItemRecord>, IngestError> {
        let total = pending.len();
        let mut new_items = Vec::with_capacity(total);

        for (index, PendingItem { item, pages }) in pending.into_iter().enumerate() {
            let enhancement = self.enhancer.enhance(&item.title, &item.content).await;
            let content = if enhancement.cleaned_content.is_empty() {
                item.content
            } else {
                enhancement.cleaned_content
            };

            new_items.push(NewItem {
                job_id: job.id.clone(),
                team_id: job.team_id.clone(),
                position: index as u32,
                title: item.title,
                content,
                author: item.author,
                source_ref: job.source_ref.clone(),
                content_kind: item.content_kind,
                summary: enhancement.summary,
                topics: enhancement.topics,
                read_time_minutes: enhancement.read_time_minutes,
                difficulty: enhancement.difficulty,
                enhanced_by: enhancement.method,
                page_start: pages.map(|(start, _)| start),
                page_end: pages.map(|(_, end)| end),
            });

            let value = Progress::interpolate(EXTRACTED, ENHANCED, index + 1, total);
            self.step(
                job,
                reporter,
                value,
                format!("Enhanced {}/{}", index + 1, total),
            )
            .await?;
        }

        self.pause().await;
        let stored = self.with_storage(|s| s.insert_items(&new_items))?;
        self.step(
            job,
            reporter,
            PERSISTED,
            format!("Saved {} item(s)", stored.len()),
        )
        .await?;

        Ok(stored)
    }

    /// Completes or fails the job according to `result`
    async fn conclude(
        &self,
        job: &JobRecord,
        result: Result<Vec<ItemRecord>, IngestError>,
        reporter: &mut ProgressReporter,
    ) -> PipelineOutcome {
        let items = match result {
            Ok(items) => items,
            Err(e) => return self.fail(job, e.to_string()),
        };

        if let Err(e) = self.with_storage(|s| s.complete_job(&job.id, items.len() as u32)) {
            return self.fail(job, e.to_string());
        }

        reporter
            .report(Some(&job.id), Progress::MAX, "Extraction complete")
            .await;
        tracing::info!("Job {} completed with {} item(s)", job.id, items.len());

        PipelineOutcome::Completed {
            job_id: job.id.clone(),
            items,
            cached: false,
        }
    }

    fn fail(&self, job: &JobRecord, message: String) -> PipelineOutcome {
        tracing::warn!("Job {} failed: {}", job.id, message);

        // Already terminal when the failure came from complete_job itself
        match self.with_storage(|s| s.get_job(&job.id)) {
            Ok(current) if !current.status.is_active() => {}
            _ => {
                if let Err(e) = self.with_storage(|s| s.fail_job(&job.id, &message)) {
                    tracing::error!("Could not mark job {} failed: {}", job.id, e);
                }
            }
        }

        Self::failed(Some(job.id.clone()), message)
    }

    fn failed(job_id: Option<String>, message: String) -> PipelineOutcome {
        PipelineOutcome::Failed { job_id, message }
    }

    async fn finish(reporter: &mut ProgressReporter, outcome: PipelineOutcome) -> PipelineOutcome {
        reporter.finish(&outcome).await;
        outcome
    }

    /// Looks up a reusable job and its items
    fn find_fresh(
        &self,
        team_id: &str,
        source_key: &str,
    ) -> Result<Option<(JobRecord, Vec<ItemRecord>)>, IngestError> {
        let since = Utc::now() - ChronoDuration::days(i64::from(self.freshness_days));

        self.with_storage(|s| {
            let Some(job) = s.find_fresh_job(team_id, source_key, since)? else {
                return Ok(None);
            };
            let items = s.get_items_for_job(&job.id)?;
            Ok(Some((job, items)))
        })
    }
}
