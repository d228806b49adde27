use crate::geometry::{CellKind, GridPos};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("mutation rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("position {0} lies outside the grid extent")]
    OutOfBounds(GridPos),
}

impl SimError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        SimError::Configuration(message.into())
    }
}

/// Why an environment edit was refused. The environment is left unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("target lies outside the extent")]
    OutsideExtent,
    #[error("the nest cannot be edited")]
    NestCell,
    #[error("cell already holds {0:?}")]
    Occupied(CellKind),
    #[error("an agent is standing on the target")]
    AgentPresent,
    #[error("nothing left to remove")]
    NothingToRemove,
}

pub type SimResult<T> = Result<T, SimError>;
