pub mod config;
pub mod error;
pub mod fixtures;
pub mod history;
pub mod league_names;
pub mod match_record;
pub mod predictor;
pub mod refresh;
pub mod report;
pub mod result_feed;
pub mod standings;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use history::{FormHistory, MatchLog};
pub use match_record::{InvalidMatch, MatchRecord, MatchResult, RawEvent, normalize};
pub use predictor::{OutcomePredictor, Prediction};
pub use standings::{StandingsAccumulator, TeamStanding};
pub use store::MatchStore;
