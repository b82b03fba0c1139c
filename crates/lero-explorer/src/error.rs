use lero_client::ClientError;
use lero_core::serialize::PlanShapeError;

/// Conditions that abort an exploration. No candidate is returned on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    /// Connection failure, or a rejected `init`, `join_card` or `predict`.
    #[error(transparent)]
    Scoring(#[from] ClientError),
    #[error("cannot describe candidate plan: {0}")]
    PlanShape(#[from] PlanShapeError),
    #[error("host planner failed: {0}")]
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("query has more than {capacity} join cardinalities to record")]
    CardinalityOverflow { capacity: usize },
}

impl ExploreError {
    pub(crate) fn host<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        ExploreError::Host(Box::new(err))
    }
}
