mod ids;
mod options;
mod progress;
mod vocab;

pub use ids::{LearnerId, ParseIdError, VocabId};
pub use options::{OptionsError, SchedulerOptions};
pub use progress::{DEFAULT_EASE, ProgressError, ProgressRecord, Rating, StudyState};
pub use vocab::{VocabError, VocabItem};
