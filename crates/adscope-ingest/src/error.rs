use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("normalized ad has no external_ad_id; adapter must reject it before ingestion")]
    MissingExternalAdId,

    #[error("ad {channel}/{external_ad_id} failed during {stage}: {source}")]
    AdPipeline {
        channel: String,
        external_ad_id: String,
        stage: &'static str,
        #[source]
        source: adscope_db::DbError,
    },

    #[error("brand '{name}' could not be resolved: {reason}")]
    Identity { name: String, reason: String },

    #[error(transparent)]
    Db(#[from] adscope_db::DbError),
}

impl IngestError {
    /// Attach an ad's natural key and pipeline stage to a store error, so
    /// the run-level caller can record a per-item failure without losing
    /// which ad broke.
    #[must_use]
    pub fn at_stage<'a>(
        channel: &'a str,
        external_ad_id: &'a str,
        stage: &'static str,
    ) -> impl FnOnce(adscope_db::DbError) -> Self + 'a {
        move |source| IngestError::AdPipeline {
            channel: channel.to_string(),
            external_ad_id: external_ad_id.to_string(),
            stage,
            source,
        }
    }
}
