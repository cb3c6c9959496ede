use crate::data::DataError;
use crate::indicators::ParamsError;
use crate::portfolio::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("data: {0}")]
    Data(#[from] DataError),

    #[error("indicator params: {0}")]
    Params(#[from] ParamsError),
}
