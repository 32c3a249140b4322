use crate::config::{ScanConfig, ScanPolicy};
use crate::error::ScanError;
use crate::manifest::ImageReference;
use crate::scanner::{ImageScan, ImageScanner};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub policy: ScanPolicy,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            policy: config.scan_policy,
            concurrency: config.concurrency,
            timeout: config.timeout(),
        }
    }
}

#[derive(Debug)]
pub struct ScanFailure {
    pub image: String,
    pub error: ScanError,
}

/// Outcome of scanning a batch of images. Both lists follow input order.
#[derive(Debug, Default)]
pub struct ScanBatch {
    pub scans: Vec<ImageScan>,
    pub failures: Vec<ScanFailure>,
}

impl ScanBatch {
    pub fn attempted(&self) -> usize {
        self.scans.len() + self.failures.len()
    }
}

/// Image strings to scan under `policy`, in first-seen order.
pub fn scan_targets(images: &[ImageReference], policy: ScanPolicy) -> Vec<String> {
    match policy {
        ScanPolicy::EveryOccurrence => images.iter().map(|r| r.image.clone()).collect(),
        ScanPolicy::Distinct => {
            let mut seen = HashSet::new();
            images
                .iter()
                .filter(|r| seen.insert(r.image.as_str()))
                .map(|r| r.image.clone())
                .collect()
        }
    }
}

/// Scan every target image with at most `options.concurrency` scans in flight.
///
/// A failed, timed-out or panicked scan is logged and recorded in
/// [`ScanBatch::failures`]; it never fails the batch. Results come back in input
/// order regardless of completion order. Dropping the returned future aborts all
/// in-flight scans.
pub async fn scan_images<S>(
    scanner: Arc<S>,
    images: &[ImageReference],
    options: ScanOptions,
) -> ScanBatch
where
    S: ImageScanner + 'static,
{
    let targets = scan_targets(images, options.policy);
    if targets.is_empty() {
        return ScanBatch::default();
    }

    let total = targets.len();
    let limit = options.concurrency.max(1);
    info!(images = total, concurrency = limit, "scanning images");

    let mut slots: Vec<Option<Result<ImageScan, ScanError>>> =
        std::iter::repeat_with(|| None).take(total).collect();
    let mut pending = targets.iter().cloned().enumerate();
    let mut in_flight = JoinSet::new();

    loop {
        while in_flight.len() < limit {
            let Some((position, image)) = pending.next() else {
                break;
            };
            let scanner = Arc::clone(&scanner);
            let timeout = options.timeout;
            in_flight.spawn(async move {
                let result = match tokio::time::timeout(timeout, scanner.scan(&image)).await {
                    Ok(Ok(results)) => Ok(ImageScan { image, results }),
                    Ok(Err(error)) => Err(error),
                    Err(_) => Err(ScanError::TimedOut(timeout)),
                };
                (position, result)
            });
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };

        match joined {
            Ok((position, result)) => {
                if let Ok(scan) = &result {
                    debug!(
                        image = %scan.image,
                        findings = scan.finding_count(),
                        "scan finished"
                    );
                }
                slots[position] = Some(result);
            }
            // The slot stays empty and is reported as aborted below.
            Err(join_error) => warn!(error = %join_error, "scan task panicked"),
        }
    }

    let mut batch = ScanBatch::default();
    for (image, slot) in targets.into_iter().zip(slots) {
        match slot {
            Some(Ok(scan)) => batch.scans.push(scan),
            Some(Err(error)) => {
                warn!(%image, %error, "error scanning image");
                batch.failures.push(ScanFailure { image, error });
            }
            None => {
                let error = ScanError::Aborted("scan task did not complete".to_string());
                warn!(%image, %error, "error scanning image");
                batch.failures.push(ScanFailure { image, error });
            }
        }
    }

    info!(
        succeeded = batch.scans.len(),
        failed = batch.failures.len(),
        "image scans finished"
    );
    batch
}
