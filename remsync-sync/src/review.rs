//! Review gate: ask the destination to move the pending changeset to review.

use crate::error::ReviewRequestError;
use crate::report::ReviewOutcome;
use crate::traits::Destination;

/// Thin pass-through to the destination's workflow signal.
pub struct ReviewRequester<'a> {
    destination: &'a dyn Destination,
    message: &'a str,
    self_approve: bool,
}

impl<'a> ReviewRequester<'a> {
    pub fn new(destination: &'a dyn Destination, message: &'a str, self_approve: bool) -> Self {
        Self {
            destination,
            message,
            self_approve,
        }
    }

    /// Request review, then approve when self-approval is enabled.
    pub fn request(&self) -> Result<ReviewOutcome, ReviewRequestError> {
        self.destination
            .request_review(self.message)
            .map_err(ReviewRequestError::Request)?;

        if !self.self_approve {
            tracing::info!("review requested");
            return Ok(ReviewOutcome::Requested);
        }

        self.destination
            .approve_changes()
            .map_err(ReviewRequestError::Approve)?;
        tracing::info!("review requested and self-approved");
        Ok(ReviewOutcome::Approved)
    }
}
