use tokio_util::sync::CancellationToken;

use crate::overlay::sequence::OverlayScope;

/// Identity and cancellation of one processing request.
///
/// Every request gets a fresh job id, which also scopes its overlay files, so concurrent requests
/// for the same activity never touch each other's assets.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub job_id: String,
    pub activity_id: String,
    pub scope: OverlayScope,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(activity_id: impl Into<String>) -> Self {
        Self::with_job_id(activity_id, uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_job_id(activity_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        let activity_id = activity_id.into();
        let job_id = job_id.into();
        Self {
            scope: OverlayScope::new(activity_id.clone(), job_id.clone()),
            job_id,
            activity_id,
            cancel: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/context.rs"]
mod tests;
