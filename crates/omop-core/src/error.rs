use omop_model::EraDomain;
use omop_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// An event failed structural validation; the whole invocation is refused.
    #[error("malformed {domain} event at row {row}: {field} {reason}")]
    MalformedEvent {
        domain: EraDomain,
        row: usize,
        field: &'static str,
        reason: String,
    },

    /// A run precondition was not met; no step was executed.
    #[error("precondition '{name}' failed: {reason}")]
    Precondition { name: String, reason: String },

    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EtlError>;
