use thiserror::Error;

/// Codec-level errors.
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    VCard(#[from] crate::vcard::ParseError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for RfcError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
