//! Runs workbook decoding and aggregation off the async runtime.

use std::time::Duration;

use tally_aggregate::TransformError;
use tally_core::error::{AppError, codes};
use tally_core::result::AppResult;

/// Run `work` on a blocking thread, bounded by `limit`.
///
/// On timeout the caller gets a `Processing` error tagged `timeout`; the
/// blocking thread runs to completion in the background and its result is
/// discarded.
pub(crate) async fn run_bounded<T, F>(limit: Duration, work: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Err(_) => Err(AppError::processing(format!(
            "Workbook processing exceeded {}s",
            limit.as_secs()
        ))
        .with_code(codes::TIMEOUT)),
        Ok(Err(join)) => Err(AppError::internal(format!(
            "Workbook processing task failed: {join}"
        ))),
        Ok(Ok(result)) => result.map_err(AppError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::error::ErrorKind;

    #[tokio::test]
    async fn test_transform_error_is_mapped() {
        let err = run_bounded::<(), _>(Duration::from_secs(5), || {
            Err(TransformError::NoWorksheet)
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Processing);
    }

    #[tokio::test]
    async fn test_slow_work_times_out() {
        let err = run_bounded(Duration::from_millis(10), || {
            std::thread::sleep(Duration::from_millis(300));
            Ok(1)
        })
        .await
        .unwrap_err();
        assert!(err.has_code(codes::TIMEOUT));
    }
}
