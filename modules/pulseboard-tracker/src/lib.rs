pub mod categorizer;
pub mod error;
pub mod feed;
pub mod monitor;
pub mod ranking;
pub mod store;
pub mod testing;
pub mod tracker;
pub mod traits;

pub use categorizer::{PollCategory, SuggestionCategorizer};
pub use error::{Result, TrackerError};
pub use feed::ApifySocialFeed;
pub use monitor::LeaderboardMonitor;
pub use store::{PgEngagementStore, Suggestion};
pub use tracker::{RefreshStats, SuggestionTracker};
pub use traits::{EngagementStore, SocialFeed, UpsertOutcome};
