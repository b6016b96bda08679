pub mod controller;
pub mod events;
pub mod state;
pub mod views;


pub use controller::DashboardController;
pub use events::{ControllerEvent, EventOutcome, LoadOutcome, RefreshOutcome, SkipReason};
pub use state::{CommittedSnapshot, ControllerPhase, DashboardState, ReadyPhase};
pub use views::{
    filter_comments, insight_counts, render_summary, theme_slices, CommentSort, InsightCategory,
    SentimentBand, ThemeSlice,
};
