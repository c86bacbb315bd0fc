//! Ingestion-time orchestration: identity resolution, the per-ad upsert
//! engine, creative fingerprint sync, fact/score maintenance, run
//! bookkeeping, and the convergence backfills.

pub mod backfill;
pub mod creative;
pub mod engine;
pub mod error;
pub mod facts;
pub mod identity;
pub mod runner;
pub mod score;

pub use backfill::{backfill_ad_creatives, backfill_ad_facts, backfill_ad_scores, BackfillReport};
pub use creative::sync_creative_membership;
pub use engine::{upsert_ad_with_assets, AdUpsertContext, UpsertedAd};
pub use error::IngestError;
pub use facts::{build_ad_facts, refresh_ad_facts};
pub use identity::{resolve_brand, sync_brand_catalog, CatalogSyncSummary, ResolvedBrand};
pub use runner::{ingest_ads, AdOutcome, IngestScope, IngestSummary};
pub use score::{compute_ad_score, SCORE_VERSION};
