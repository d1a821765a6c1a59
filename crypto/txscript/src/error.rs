use crate::script_builder::ScriptBuilderError;
use thiserror::Error;

#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum TxScriptError {
    #[error("script is not a standard pay-to-public-key-hash script")]
    PubKeyFormat,

    #[error(transparent)]
    ScriptBuilder(#[from] ScriptBuilderError),
}
