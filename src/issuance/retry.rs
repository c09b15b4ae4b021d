use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::core::error::{CertificateError, Result};

/// Upper bound on pages fetched by a single listing. Guards against a provider
/// that never returns a terminal page.
pub const MAX_PAGES: usize = 1000;

/// Follows a paginated listing until the provider stops returning a cursor.
///
/// `fetch` receives the cursor for the next page (`None` for the first page)
/// and returns that page's items plus the following cursor.
pub async fn collect_pages<T, C, F, Fut>(operation: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<C>)>>,
{
    let mut items = Vec::new();
    let mut cursor = None;

    for page in 1..=MAX_PAGES {
        let (mut batch, next) = fetch(cursor).await?;
        debug!(
            "[pagination] {} page {} returned {} item(s)",
            operation,
            page,
            batch.len()
        );
        items.append(&mut batch);
        match next {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }

    warn!(
        "[pagination] {} still truncated after {} pages, giving up",
        operation, MAX_PAGES
    );
    Err(CertificateError::service(
        operation,
        format!("listing did not terminate after {MAX_PAGES} pages"),
    ))
}

/// Polls `check` until it reports completion.
///
/// `check` returns:
/// - `Ok(true)` when the condition is met
/// - `Ok(false)` to poll again after `interval`
/// - `Err(_)` to stop immediately
pub async fn poll_until<F, Fut>(
    subject: &str,
    operation: &str,
    interval: Duration,
    max_attempts: u32,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();

    for attempt in 1..=max_attempts {
        debug!(
            "[poll] {} attempt {} for {}",
            operation, attempt, subject
        );
        match check().await {
            Ok(true) => {
                debug!(
                    "[poll] {} succeeded after {}ms (attempt {})",
                    operation,
                    started.elapsed().as_millis(),
                    attempt
                );
                return Ok(());
            }
            Ok(false) => {
                if attempt < max_attempts {
                    debug!(
                        "[poll] {} not complete for {}, waiting {}s",
                        operation,
                        subject,
                        interval.as_secs()
                    );
                    tokio::time::sleep(interval).await;
                }
            }
            Err(err) => {
                warn!("[poll] {} failed for {}: {}", operation, subject, err);
                return Err(err);
            }
        }
    }

    warn!(
        "[poll] {} gave up on {} after {} attempts",
        operation, subject, max_attempts
    );
    Err(CertificateError::service(
        operation,
        format!("{subject} not complete after {max_attempts} attempts"),
    ))
}
