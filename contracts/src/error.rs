use sensible_txscript::script_builder::ScriptBuilderError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Custom(String),

    #[error("missing contract template: {0}")]
    MissingTemplate(String),

    #[error("invalid protocol configuration: {0}")]
    InvalidConfig(String),

    #[error("unable to read configuration file: {0}")]
    Io(String),

    #[error("configuration parse error: {0}")]
    Toml(String),

    #[error("hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    ScriptBuilder(#[from] ScriptBuilderError),

    #[error("script does not carry a protocol data part")]
    NotProtocolScript,

    #[error("field `{field}` is {len} bytes long, the maximum is {max}")]
    FieldTooLong { field: &'static str, len: usize, max: usize },

    #[error("invalid sensible id: {0}")]
    InvalidSensibleId(String),

    #[error("no check contract tier supports {inputs} inputs and {outputs} outputs")]
    UnsupportedTier { inputs: usize, outputs: usize },

    #[error("receiver address and amount lists differ in length ({0} != {1})")]
    ReceiverMismatch(usize, usize),

    #[error("input index {0} is out of range")]
    InputIndexOutOfRange(usize),

    #[error("output index {0} is out of range")]
    OutputIndexOutOfRange(usize),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Custom(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
