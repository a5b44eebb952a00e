//! Trajectory-analysis and conversation-orchestration engine.
//!
//! The engine computes relatedness between life events, recommends which
//! persona should handle an event, drives the conversation lifecycle, tracks
//! per-(user, persona) relationship strength, and summarizes recent history
//! into trend forecasts. Persistence and text completion are injected
//! through the `lifeweave-store` and `lifeweave-provider` traits; this crate
//! owns the orchestration logic only.

pub mod config;
pub mod connections;
pub mod enrich;
pub mod error;
pub mod lock;
pub mod manager;
pub mod persona;
pub mod prompts;
pub mod recommend;
pub mod relationship;
pub mod timeline;
pub mod trends;

pub use config::CoreConfig;
pub use connections::ConnectionAnalyzer;
pub use error::{CoreError, CoreResult};
pub use lock::{KeyGuard, KeyedLocks, LockKey};
pub use manager::{ChatStream, ConversationManager, ConversationStats};
pub use persona::{PersonaProfile, PersonaRegistry};
pub use recommend::{recommend_multiple, recommend_primary};
pub use relationship::RelationshipTracker;
pub use timeline::TimelineAnalytics;
pub use trends::{EmotionalTrend, GrowthArea, TrajectoryOverview, TrendPredictor, TrendReport};
