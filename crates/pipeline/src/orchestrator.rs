use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use extrato_core::{CandidateTransaction, Ledger, LedgerError, LedgerTransaction};
use extrato_import::{DuplicateDetector, ParseError};
use extrato_model::{InferenceBackend, ModelError, StatementTextRecognizer};
use extrato_ocr::{
    DocumentTextExtractor, ExtractError, PaginatedDocument, RecognitionConfig, TextRecognizer,
};

use crate::config::ImportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Idle,
    Parsing,
    Extracting,
    Recognizing,
    Deduplicating,
    Reviewing,
    Committing,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportStatus::Idle => "idle",
            ImportStatus::Parsing => "parsing",
            ImportStatus::Extracting => "extracting",
            ImportStatus::Recognizing => "recognizing",
            ImportStatus::Deduplicating => "deduplicating",
            ImportStatus::Reviewing => "reviewing",
            ImportStatus::Committing => "committing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Published on the progress channel after every stage transition.
/// `fraction` never decreases within a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportProgress {
    pub status: ImportStatus,
    pub fraction: f32,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("an import is already in progress")]
    Busy,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("no transactions found in the statement")]
    NoTransactions,
    #[error("operation not valid in status '{0}'")]
    InvalidTransition(ImportStatus),
    #[error("import was cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

/// What to import. Legacy files arrive as raw bytes; documents arrive
/// pre-opened since rendering needs the whole file anyway.
pub enum ImportSource {
    Legacy(Vec<u8>),
    Document(Arc<dyn PaginatedDocument>),
}

/// Outcome of the staging phase, presented for user review before commit.
#[derive(Debug)]
pub struct ImportResult {
    pub accepted: Vec<CandidateTransaction>,
    pub duplicates: Vec<CandidateTransaction>,
    /// Source records that could not be turned into candidates.
    pub skipped_records: usize,
}

#[derive(Debug)]
pub struct RecordError {
    pub id: String,
    pub message: String,
}

#[derive(Debug)]
pub struct CommitSummary {
    pub saved: usize,
    pub failed: Vec<RecordError>,
    pub duplicates_skipped: usize,
}

struct ReviewState {
    accepted: Vec<CandidateTransaction>,
    duplicates_skipped: usize,
    account_id: i64,
}

/// Drives one import at a time through parse/extract, recognition, duplicate
/// detection, review and commit. A second import cannot start until the
/// current one is reset, even after it completed or failed; the review result
/// stays inspectable until then.
pub struct ImportOrchestrator<R, B> {
    ledger: Arc<dyn Ledger>,
    extractor: DocumentTextExtractor<R>,
    recognizer: StatementTextRecognizer<B>,
    config: ImportConfig,
    progress: watch::Sender<ImportProgress>,
    active: AtomicBool,
    cancel: AtomicBool,
    review: Mutex<Option<ReviewState>>,
}

impl<R, B> ImportOrchestrator<R, B>
where
    R: TextRecognizer + 'static,
    B: InferenceBackend,
{
    pub fn new(
        ledger: Arc<dyn Ledger>,
        extractor: DocumentTextExtractor<R>,
        recognizer: StatementTextRecognizer<B>,
        config: ImportConfig,
    ) -> Self {
        let recognition = RecognitionConfig {
            languages: config.languages.clone(),
            ..RecognitionConfig::default()
        };
        let extractor = extractor
            .with_config(recognition)
            .with_limits(config.max_document_bytes, config.min_mean_confidence);
        let (progress, _) = watch::channel(ImportProgress {
            status: ImportStatus::Idle,
            fraction: 0.0,
        });
        ImportOrchestrator {
            ledger,
            extractor,
            recognizer,
            config,
            progress,
            active: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            review: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ImportStatus {
        self.progress.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.progress.subscribe()
    }

    /// Ask the running import to stop. Takes effect at the next stage
    /// boundary; a stage that already started runs to completion.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Stage an import into `account_id` and stop at review. Fails with
    /// `Busy` while another import holds the orchestrator.
    pub async fn begin_import(
        &self,
        source: ImportSource,
        account_id: i64,
    ) -> Result<ImportResult, ImportError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ImportError::Busy);
        }
        self.progress.send_replace(ImportProgress {
            status: ImportStatus::Idle,
            fraction: 0.0,
        });

        match self.run(source, account_id).await {
            Ok(result) => Ok(result),
            Err(ImportError::Cancelled) => {
                self.set_stage(ImportStatus::Cancelled, 0.0);
                Err(ImportError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(error = %e, "import failed");
                self.set_stage(ImportStatus::Failed, 0.0);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        source: ImportSource,
        account_id: i64,
    ) -> Result<ImportResult, ImportError> {
        let (candidates, skipped_records, detector) = match source {
            ImportSource::Legacy(data) => {
                self.set_stage(ImportStatus::Parsing, 0.0);
                let (syntax, statement) =
                    tokio::task::spawn_blocking(move || extrato_import::parse(&data))
                        .await
                        .map_err(|e| ImportError::Internal(e.to_string()))??;
                tracing::info!(
                    ?syntax,
                    transactions = statement.transactions.len(),
                    skipped = statement.skipped_records,
                    "parsed legacy statement"
                );
                let candidates: Vec<_> = statement
                    .transactions
                    .iter()
                    .map(CandidateTransaction::from_raw)
                    .collect();
                self.set_stage(ImportStatus::Deduplicating, 0.6);
                (
                    candidates,
                    statement.skipped_records,
                    DuplicateDetector::for_legacy(),
                )
            }
            ImportSource::Document(document) => {
                self.set_stage(ImportStatus::Extracting, 0.0);
                let text = self.extractor.extract(document).await?;
                self.check_cancelled()?;
                self.set_stage(ImportStatus::Recognizing, 0.3);
                let recognition = self.recognizer.recognize(&text.full_text()).await?;
                self.set_stage(ImportStatus::Deduplicating, 0.7);
                (
                    recognition.candidates,
                    recognition.dropped_records,
                    DuplicateDetector::for_document(),
                )
            }
        };
        self.check_cancelled()?;

        if candidates.is_empty() {
            return Err(ImportError::NoTransactions);
        }

        let existing = self.ledger_window(&candidates, account_id).await?;
        let (accepted, duplicates) = detector.partition(candidates, &existing);
        tracing::info!(
            accepted = accepted.len(),
            duplicates = duplicates.len(),
            "duplicate detection finished"
        );

        self.set_stage(ImportStatus::Reviewing, 0.9);
        *self.review.lock().await = Some(ReviewState {
            accepted: accepted.clone(),
            duplicates_skipped: duplicates.len(),
            account_id,
        });

        Ok(ImportResult {
            accepted,
            duplicates,
            skipped_records,
        })
    }

    /// Write the selected reviewed candidates to the ledger. Failures are
    /// per-record: one bad write does not roll back the others. Accepted
    /// candidates left out of `selected_ids` are simply not saved.
    pub async fn commit(&self, selected_ids: &[String]) -> Result<CommitSummary, ImportError> {
        let mut review = self.review.lock().await;
        let state = match review.take() {
            Some(state) => state,
            None => return Err(ImportError::InvalidTransition(self.status())),
        };

        self.set_stage(ImportStatus::Committing, 0.9);
        let selected: Vec<&CandidateTransaction> = state
            .accepted
            .iter()
            .filter(|c| selected_ids.contains(&c.id))
            .collect();
        let total = selected.len().max(1);
        let mut saved = 0;
        let mut failed = Vec::new();
        for (index, candidate) in selected.iter().enumerate() {
            let tx = LedgerTransaction::from_candidate(candidate, state.account_id);
            match self.ledger.add_transaction(tx).await {
                Ok(()) => saved += 1,
                Err(e) => failed.push(RecordError {
                    id: candidate.id.clone(),
                    message: e.to_string(),
                }),
            }
            let fraction = 0.9 + 0.1 * ((index + 1) as f32 / total as f32);
            self.set_stage(ImportStatus::Committing, fraction);
        }

        self.set_stage(ImportStatus::Completed, 1.0);
        tracing::info!(saved, failed = failed.len(), "commit finished");
        Ok(CommitSummary {
            saved,
            failed,
            duplicates_skipped: state.duplicates_skipped,
        })
    }

    /// Release the orchestrator for the next import. Only valid once the
    /// current run has settled.
    pub async fn reset(&self) -> Result<(), ImportError> {
        let status = self.status();
        if matches!(
            status,
            ImportStatus::Parsing
                | ImportStatus::Extracting
                | ImportStatus::Recognizing
                | ImportStatus::Deduplicating
                | ImportStatus::Committing
        ) {
            return Err(ImportError::InvalidTransition(status));
        }
        *self.review.lock().await = None;
        self.cancel.store(false, Ordering::SeqCst);
        self.progress.send_replace(ImportProgress {
            status: ImportStatus::Idle,
            fraction: 0.0,
        });
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), ImportError> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    fn set_stage(&self, status: ImportStatus, fraction: f32) {
        self.progress.send_modify(|p| {
            p.status = status;
            if fraction > p.fraction {
                p.fraction = fraction;
            }
        });
    }

    /// Existing transactions to match duplicates against: a date window
    /// around the candidates, restricted to the target account so a similar
    /// purchase on another account never shadows a candidate.
    async fn ledger_window(
        &self,
        candidates: &[CandidateTransaction],
        account_id: i64,
    ) -> Result<Vec<LedgerTransaction>, ImportError> {
        let dates = candidates.iter().map(|c| c.date);
        let (Some(min), Some(max)) = (dates.clone().min(), dates.max()) else {
            return Ok(Vec::new());
        };
        let window = Duration::days(self.config.dedup_window_days);
        let existing = self
            .ledger
            .transactions_in_range(min - window, max + window)
            .await?;
        Ok(existing
            .into_iter()
            .filter(|t| t.account_id == account_id)
            .collect())
    }
}
