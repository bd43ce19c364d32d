//! QuizForge quiz service.
//!
//! Assembles fully denormalized quizzes from per-type relational storage and
//! serves repeated reads from a versioned cache.
//!
//! ```text
//! QuizService
//!   ├── VersionedCache ── CacheTier (LocalTier | RedisTier)
//!   │                  └─ AnalyticsRecorder (LocalAnalytics | RedisAnalytics)
//!   ├── Invalidator
//!   ├── AggregateLoader ── fetch_base → group_by_type → enrich_groups → assemble
//!   └── PerformanceLog
//! ```

pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod pipeline;
pub mod progressive;
pub mod service;

pub use analytics::{AnalyticsRecorder, AnalyticsSnapshot, KeyStats, SampleFilter};
pub use cache::{CacheKey, CacheOutcome, CacheRead, CacheTier};
pub use config::{AppConfig, CacheBackendKind, SourceBackend};
pub use error::QuizError;
pub use progressive::{LoadProgress, ProgressCallback, ProgressiveLoad};
pub use service::{QuizService, QuizServiceBuilder, ServiceStats};
