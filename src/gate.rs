use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;

use crate::error::{ExternalServiceError, MarketError, MarketResult};
use crate::models::ImageRef;

const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Raw image bytes with their sniffed MIME type and SHA-256 digest.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    bytes: Arc<[u8]>,
    mime: String,
    digest: String,
}

impl ImageUpload {
    pub fn from_bytes(bytes: Vec<u8>) -> MarketResult<Self> {
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            debug!("rejecting upload with mime {mime}");
            return Err(MarketError::missing("images"));
        }
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Ok(Self { bytes: bytes.into(), mime, digest })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn mime(&self) -> &str {
        &self.mime
    }
    pub fn digest(&self) -> &str {
        &self.digest
    }
    pub fn image_ref(&self) -> ImageRef {
        ImageRef::from_digest(&self.digest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Verified,
    Rejected,
}

/// Per-image state inside a draft. Unverified images count as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl From<Verdict> for VerificationStatus {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Verified => VerificationStatus::Verified,
            Verdict::Rejected => VerificationStatus::Rejected,
        }
    }
}

#[async_trait]
pub trait ImageVerifier: Send + Sync {
    async fn verify(&self, image: &ImageUpload) -> Result<Verdict, ExternalServiceError>;
}

/// Content-safety model returning a score in `[0, 1]`.
#[async_trait]
pub trait NsfwScorer: Send + Sync {
    async fn score(&self, image: &ImageUpload) -> Result<f32, ExternalServiceError>;
}

/// Verified when the score is strictly below the threshold.
pub struct ThresholdVerifier<S> {
    scorer: S,
    threshold: f32,
}

impl<S: NsfwScorer> ThresholdVerifier<S> {
    pub fn new(scorer: S, threshold: f32) -> Self {
        Self { scorer, threshold }
    }
}

#[async_trait]
impl<S: NsfwScorer> ImageVerifier for ThresholdVerifier<S> {
    async fn verify(&self, image: &ImageUpload) -> Result<Verdict, ExternalServiceError> {
        let score = self.scorer.score(image).await?;
        if !(0.0..=1.0).contains(&score) {
            return Err(ExternalServiceError::InvalidResponse(format!("score {score} out of range")));
        }
        Ok(if score < self.threshold { Verdict::Verified } else { Verdict::Rejected })
    }
}

/// What to do when the verifier itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Treat the image as verified and attach a warning.
    Open,
    /// Treat the image as rejected and attach a warning.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub verdict: Verdict,
    /// Set when the verdict came from the fail policy rather than the verifier.
    pub warning: Option<String>,
}

pub struct VerificationGate {
    verifier: Arc<dyn ImageVerifier>,
    policy: FailPolicy,
    // digest -> verdict, only for answers the verifier actually gave
    cache: DashMap<String, Verdict>,
}

impl VerificationGate {
    pub fn new(verifier: Arc<dyn ImageVerifier>, policy: FailPolicy) -> Self {
        Self { verifier, policy, cache: DashMap::new() }
    }

    pub fn policy(&self) -> FailPolicy {
        self.policy
    }

    pub fn cached(&self, image: &ImageUpload) -> Option<Verdict> {
        self.cache.get(image.digest()).map(|v| *v)
    }

    pub async fn verify(&self, image: &ImageUpload) -> GateOutcome {
        if let Some(verdict) = self.cached(image) {
            return GateOutcome { verdict, warning: None };
        }
        match self.verifier.verify(image).await {
            Ok(verdict) => {
                self.cache.insert(image.digest().to_string(), verdict);
                GateOutcome { verdict, warning: None }
            }
            Err(e) => {
                warn!("image verification failed for {}: {e}", image.digest());
                let verdict = match self.policy {
                    FailPolicy::Open => Verdict::Verified,
                    FailPolicy::Closed => Verdict::Rejected,
                };
                GateOutcome { verdict, warning: Some(format!("verification unavailable: {e}")) }
            }
        }
    }
}

struct DraftImage {
    upload: Arc<ImageUpload>,
    status: VerificationStatus,
    warning: Option<String>,
    task: Option<JoinHandle<GateOutcome>>,
}

/// Ordered images of a listing draft together with their verification state.
///
/// Verification runs in background tasks owned by the draft; dropping the
/// draft aborts whatever is still in flight.
pub struct DraftImages {
    max: usize,
    entries: Vec<DraftImage>,
}

impl DraftImages {
    pub fn new(max: usize) -> Self {
        Self { max, entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an image and returns its index.
    pub fn add(&mut self, upload: ImageUpload) -> MarketResult<usize> {
        if self.entries.len() >= self.max {
            return Err(MarketError::missing("images"));
        }
        self.entries.push(DraftImage {
            upload: Arc::new(upload),
            status: VerificationStatus::Pending,
            warning: None,
            task: None,
        });
        Ok(self.entries.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Option<ImageUpload> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        if let Some(task) = &entry.task {
            task.abort();
        }
        Some((*entry.upload).clone())
    }

    pub fn first(&self) -> Option<&ImageUpload> {
        self.entries.first().map(|e| e.upload.as_ref())
    }

    /// Starts verification for every image that has no verdict and no task.
    pub fn start_verification(&mut self, gate: &Arc<VerificationGate>) {
        for entry in self.entries.iter_mut() {
            if entry.status != VerificationStatus::Pending || entry.task.is_some() {
                continue;
            }
            if let Some(verdict) = gate.cached(&entry.upload) {
                entry.status = verdict.into();
                continue;
            }
            let gate = gate.clone();
            let upload = entry.upload.clone();
            entry.task = Some(tokio::spawn(async move { gate.verify(&upload).await }));
        }
    }

    /// Waits for every in-flight verification and records the results.
    pub async fn settle(&mut self) {
        for entry in self.entries.iter_mut() {
            let Some(task) = entry.task.take() else { continue };
            match task.await {
                Ok(outcome) => {
                    entry.status = outcome.verdict.into();
                    entry.warning = outcome.warning;
                }
                // aborted or panicked: stays pending and can be restarted
                Err(e) => warn!("verification task for {} ended: {e}", entry.upload.digest()),
            }
        }
    }

    pub fn statuses(&self) -> Vec<VerificationStatus> {
        self.entries.iter().map(|e| e.status).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries.iter().filter_map(|e| e.warning.clone()).collect()
    }

    /// `(pending, rejected)` image counts.
    pub fn blocking_counts(&self) -> (usize, usize) {
        self.entries.iter().fold((0, 0), |(p, r), e| match e.status {
            VerificationStatus::Pending => (p + 1, r),
            VerificationStatus::Rejected => (p, r + 1),
            VerificationStatus::Verified => (p, r),
        })
    }

    pub fn image_refs(&self) -> Vec<ImageRef> {
        self.entries.iter().map(|e| e.upload.image_ref()).collect()
    }
}

impl Drop for DraftImages {
    fn drop(&mut self) {
        for entry in &self.entries {
            if let Some(task) = &entry.task {
                task.abort();
            }
        }
    }
}
