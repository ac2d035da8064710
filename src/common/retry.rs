// src/common/retry.rs

use std::future::Future;

use crate::common::error::AppError;

/// Reexecuta a transição inteira (leitura nova -> decisão -> commit) enquanto o
/// erro for transitório. Erros de validação, capacidade e transição voltam na hora.
pub async fn with_retries<T, F, Fut>(
    operation: &'static str,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_attempts = max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt().await {
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    operation,
                    attempt = n,
                    max_attempts,
                    "Conflito transitório, repetindo a transição: {}",
                    e
                );
            }
            other => return other,
        }
    }

    Err(AppError::RetriesExhausted {
        operation,
        attempts: max_attempts,
    })
}
