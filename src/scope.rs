//! Block-scoped resource lifecycle.
//!
//! [`run_scoped`] hands a resource to a unit of work and releases it on every
//! way out of that work: normal return, returned error, or panic. The
//! factory's scoped session, the pool's `with_session` and the static
//! factory compositions are all built on it.
//!
//! # Failure precedence
//!
//! | Work | Release | Returned |
//! |------|---------|----------|
//! | `Ok(v)` | `Ok` | `Ok(v)` |
//! | `Ok(v)` | `Err(r)` | `Err(r.into())` |
//! | `Err(e)` | any | `Err(e)`, release failure logged |
//! | panic | any | panic resumed, release failure logged |

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::result::Result as StdResult;

use futures_util::FutureExt;
use tracing::warn;

use crate::error::{Error, Result};

// ============================================================================
// run_scoped
// ============================================================================

/// Runs `work` against `resource`, then `release`s it whatever happened.
///
/// The unit of work's error type is the caller's; crate errors raised by the
/// release convert into it through `From<Error>`.
///
/// # Errors
///
/// The unit of work's error unchanged, or the release error when the unit
/// of work succeeded.
///
/// # Example
///
/// ```
/// use broker_client::scope::run_scoped;
///
/// # async fn example() -> broker_client::Result<()> {
/// let answer = run_scoped(
///     String::from("resource"),
///     |name| async move { Ok::<_, broker_client::Error>(name.len()) },
///     |_name| async { Ok(()) },
/// )
/// .await?;
/// assert_eq!(answer, 8);
/// # Ok(())
/// # }
/// ```
pub async fn run_scoped<R, T, E, W, WorkFut, Rel, RelFut>(
    resource: R,
    work: W,
    release: Rel,
) -> StdResult<T, E>
where
    R: Clone,
    W: FnOnce(R) -> WorkFut,
    WorkFut: Future<Output = StdResult<T, E>>,
    Rel: FnOnce(R) -> RelFut,
    RelFut: Future<Output = Result<()>>,
    E: From<Error>,
{
    let held = resource.clone();
    let outcome = AssertUnwindSafe(async move { work(held).await })
        .catch_unwind()
        .await;

    let released = release(resource).await;

    match outcome {
        Ok(Ok(value)) => {
            released.map_err(E::from)?;
            Ok(value)
        }
        Ok(Err(err)) => {
            if let Err(release_err) = released {
                warn!(error = %release_err, "Release failed after unit of work failed");
            }
            Err(err)
        }
        Err(panic) => {
            if let Err(release_err) = released {
                warn!(error = %release_err, "Release failed after unit of work panicked");
            }
            resume_unwind(panic)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_release(
        count: &Arc<AtomicUsize>,
        fail: bool,
    ) -> impl FnOnce(u32) -> std::future::Ready<Result<()>> {
        let count = Arc::clone(count);
        move |_resource| {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if fail {
                Err(Error::transport("release failed"))
            } else {
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_success_returns_value_and_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let result: Result<u32> = run_scoped(
            7u32,
            |r| async move { Ok(r * 6) },
            counting_release(&releases, false),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_propagates_after_release() {
        let releases = Arc::new(AtomicUsize::new(0));
        let result: Result<u32> = run_scoped(
            1u32,
            |_| async { Err(Error::protocol("boom")) },
            counting_release(&releases, false),
        )
        .await;

        assert!(matches!(result, Err(Error::Protocol { .. })));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_error_does_not_mask_work_error() {
        let releases = Arc::new(AtomicUsize::new(0));
        let result: Result<u32> = run_scoped(
            1u32,
            |_| async { Err(Error::protocol("primary")) },
            counting_release(&releases, true),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("primary"));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_error_surfaces_after_success() {
        let releases = Arc::new(AtomicUsize::new(0));
        let result: Result<u32> = run_scoped(
            1u32,
            |r| async move { Ok(r) },
            counting_release(&releases, true),
        )
        .await;

        assert!(matches!(result, Err(Error::Transport { .. })));
    }

    #[tokio::test]
    async fn test_caller_error_type() {
        let releases = Arc::new(AtomicUsize::new(0));
        let result: anyhow::Result<()> = run_scoped(
            1u32,
            |_| async { Err(anyhow::anyhow!("domain failure")) },
            counting_release(&releases, false),
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "domain failure");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_releases_then_resumes() {
        let releases = Arc::new(AtomicUsize::new(0));
        let scoped = run_scoped(
            1u32,
            |_| async {
                if true {
                    panic!("work panicked");
                }
                Ok::<u32, Error>(0)
            },
            counting_release(&releases, false),
        );

        let caught = AssertUnwindSafe(scoped).catch_unwind().await;
        assert!(caught.is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
