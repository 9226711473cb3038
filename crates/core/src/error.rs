use thiserror::Error;

use crate::model::{OptionsError, ProgressError, VocabError};
use crate::scheduler::SchedulerError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Vocab(#[from] VocabError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
