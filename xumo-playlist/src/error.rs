use thiserror::Error;

/**
    Errors raised while resolving channels into playable streams and guide data.

    Which of these are fatal depends on scope: anything raised while fetching the
    catalog aborts the run, anything raised for a single channel only drops that
    channel (or leaves a gap in its schedule).
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("schema mismatch in {endpoint} response: {detail}")]
    SchemaMismatch {
        endpoint: &'static str,
        detail: String,
    },

    #[error("unresolved placeholder '[{token}]' in manifest template")]
    UnresolvedPlaceholder { token: String },

    #[error("schedule gap at {bucket}: {reason}")]
    ScheduleGap { bucket: String, reason: String },

    #[error("nothing playable: {detail}")]
    NotAiring { detail: String },
}

impl Error {
    pub fn schema(endpoint: &'static str, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            endpoint,
            detail: detail.into(),
        }
    }

    pub fn not_airing(detail: impl Into<String>) -> Self {
        Self::NotAiring {
            detail: detail.into(),
        }
    }

    /// Short machine-friendly label, used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::UnresolvedPlaceholder { .. } => "unresolved_placeholder",
            Self::ScheduleGap { .. } => "schedule_gap",
            Self::NotAiring { .. } => "not_airing",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
