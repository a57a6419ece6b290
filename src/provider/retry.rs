use std::future::Future;
use tracing::warn;

/// Outcome of one attempt that reached the provider and got a reply
#[derive(Debug)]
pub enum Attempt<T> {
    Valid(T),
    /// Reply was malformed or failed validation; the message is fed back
    Invalid(String),
}

#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Non-retryable failure, returned from the attempt that hit it
    Fatal(E),
    Exhausted { attempts: u32, last_error: String },
}

/// Run `operation` until it yields a valid reply, for at most
/// `max_retries + 1` attempts, without delay between attempts.
///
/// Only `Attempt::Invalid` triggers another attempt; an `Err` ends the loop
/// immediately. The operation receives the 1-based attempt number and the
/// previous validation error, if any.
pub async fn retry_on_invalid<F, Fut, T, E>(
    max_retries: u32,
    mut operation: F,
) -> Result<(T, u32), RetryError<E>>
where
    F: FnMut(u32, Option<String>) -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let max_attempts = max_retries.saturating_add(1);
    let mut last_error: Option<String> = None;

    for attempt in 1..=max_attempts {
        match operation(attempt, last_error.take()).await {
            Ok(Attempt::Valid(value)) => return Ok((value, attempt)),
            Ok(Attempt::Invalid(error)) => {
                if attempt < max_attempts {
                    warn!("Attempt {} returned an invalid reply: {}. Retrying", attempt, error);
                }
                last_error = Some(error);
            }
            Err(e) => return Err(RetryError::Fatal(e)),
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
        last_error: last_error.unwrap_or_default(),
    })
}
