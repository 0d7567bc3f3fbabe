use crate::translator;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("translation error: {0}")]
    Translation(#[from] translator::Error),
}
