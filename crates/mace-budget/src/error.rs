use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BudgetError {
    #[error("Unknown Nova model '{model}'. Valid models: {valid}")]
    UnknownNovaModel { model: String, valid: String },
}
