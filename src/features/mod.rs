//! Optional form behaviours enabled through [`crate::config::Capabilities`].

pub mod adaptation;
pub mod analytics;
pub mod autosave;
pub mod dynamic;
pub mod gamification;
pub mod shield;
pub mod suggestions;
pub mod timer;

pub use adaptation::{AdaptationConfig, BehaviorTracker};
pub use analytics::{AnalyticsConfig, AnalyticsSummary};
pub use autosave::{AutosaveConfig, AutosaveTracker};
pub use dynamic::{DynamicGroup, DynamicGroups};
pub use gamification::{GamificationConfig, PointsTracker};
pub use shield::{InputShield, ShieldConfig};
pub use suggestions::SuggestionSources;
pub use timer::{FormTimerConfig, Timers};
