//! Input bounds for job creation and waiting.

use crate::error::{DomainError, DomainResult};

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 1000;
/// Maximum number of replicas one create call may request.
pub const MAX_REPLICAS: usize = 20;
/// Maximum number of jobs one wait call may name.
pub const MAX_WAIT_JOBS: usize = 20;

/// Validate a prompt: non-empty after trimming, bounded length.
pub fn validate_prompt(prompt: &str) -> DomainResult<()> {
    if prompt.trim().is_empty() {
        return Err(DomainError::validation("prompt must not be empty"));
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(DomainError::validation(format!(
            "prompt is {chars} characters, maximum is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

/// Validate a replication count, `1..=MAX_REPLICAS`.
pub fn validate_count(count: usize) -> DomainResult<()> {
    if count == 0 || count > MAX_REPLICAS {
        return Err(DomainError::validation(format!(
            "count must be between 1 and {MAX_REPLICAS}, got {count}"
        )));
    }
    Ok(())
}

/// Validate a wait batch size, `1..=MAX_WAIT_JOBS`.
pub fn validate_wait_batch(len: usize) -> DomainResult<()> {
    if len == 0 {
        return Err(DomainError::validation("at least one job id is required"));
    }
    if len > MAX_WAIT_JOBS {
        return Err(DomainError::validation(format!(
            "at most {MAX_WAIT_JOBS} job ids may be waited on, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_prompts_are_rejected() {
        assert!(validate_prompt("").is_err());
        assert!(validate_prompt("   \n\t").is_err());
        assert!(validate_prompt("a red apple").is_ok());
    }

    #[test]
    fn prompt_length_bound_counts_chars() {
        let max = "x".repeat(MAX_PROMPT_CHARS);
        assert!(validate_prompt(&max).is_ok());
        let over = "x".repeat(MAX_PROMPT_CHARS + 1);
        assert!(validate_prompt(&over).is_err());
    }

    #[test]
    fn count_bounds() {
        assert!(validate_count(0).is_err());
        assert!(validate_count(1).is_ok());
        assert!(validate_count(MAX_REPLICAS).is_ok());
        assert!(validate_count(MAX_REPLICAS + 1).is_err());
    }

    #[test]
    fn wait_batch_bounds() {
        assert!(validate_wait_batch(0).is_err());
        assert!(validate_wait_batch(1).is_ok());
        assert!(validate_wait_batch(MAX_WAIT_JOBS).is_ok());
        assert!(validate_wait_batch(MAX_WAIT_JOBS + 1).is_err());
    }
}
