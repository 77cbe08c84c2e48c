//! Errors surfaced by the engine

use std::fmt::Debug;

use amqp_lite_types::{
    definitions::{self, AmqpError, ConnectionError, ErrorCondition},
    primitives::{Binary, Symbol},
    sasl::SaslCode,
};

/// Condition reported when a sent message is released by the peer
pub const MESSAGE_RELEASED: &str = "com.microsoft:message-released";

/// Condition reported when a blocking operation times out
pub const TIMEOUT: &str = "com.microsoft:timeout";

/// Error type of the engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A local protocol error
    #[error("{0}")]
    Amqp(definitions::Error),

    /// The peer closed, ended or detached with an error
    #[error("Remote error: {0}")]
    Remote(definitions::Error),

    /// The transport failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A blocking operation did not complete in time
    #[error("Operation timed out")]
    Timeout,

    /// The peer released the message
    #[error("The message was released by the peer")]
    MessageReleased,

    /// The address is not a valid url
    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    /// The address is a url but not an AMQP address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// SASL negotiation did not succeed
    #[error("SASL negotiation failed with code {code:?}")]
    Sasl {
        /// Outcome code sent by the peer
        code: SaslCode,
        /// Additional data sent by the peer
        additional_data: Option<Binary>,
    },

    /// The peer answered with a different protocol header
    #[error("Protocol header mismatch {0:?}")]
    ProtocolHeaderMismatch([u8; 8]),
}

impl Error {
    /// Creates a local protocol error
    pub fn amqp(condition: impl Into<ErrorCondition>, description: impl Into<String>) -> Self {
        Self::Amqp(definitions::Error::new(
            condition,
            Some(description.into()),
            None,
        ))
    }

    pub(crate) fn illegal_state(operation: &str, state: impl Debug) -> Self {
        Self::amqp(
            AmqpError::IllegalState,
            format!("{} is not allowed in state {:?}", operation, state),
        )
    }

    pub(crate) fn not_allowed(description: impl Into<String>) -> Self {
        Self::amqp(AmqpError::NotAllowed, description)
    }

    pub(crate) fn not_found(description: impl Into<String>) -> Self {
        Self::amqp(AmqpError::NotFound, description)
    }

    /// The AMQP condition that best describes the error
    pub fn condition(&self) -> ErrorCondition {
        match self {
            Error::Amqp(error) | Error::Remote(error) => error.condition.clone(),
            Error::Io(_) => ConnectionError::ConnectionForced.into(),
            Error::Timeout => ErrorCondition::Custom(Symbol::from(TIMEOUT)),
            Error::MessageReleased => ErrorCondition::Custom(Symbol::from(MESSAGE_RELEASED)),
            Error::UrlError(_) | Error::InvalidAddress(_) => AmqpError::InvalidField.into(),
            Error::Sasl { .. } => AmqpError::UnauthorizedAccess.into(),
            Error::ProtocolHeaderMismatch(_) => AmqpError::NotImplemented.into(),
        }
    }

    /// Converts the error into the body carried by a close, end or detach
    pub fn to_amqp_error(&self) -> definitions::Error {
        match self {
            Error::Amqp(error) | Error::Remote(error) => error.clone(),
            other => definitions::Error::new(other.condition(), Some(other.to_string()), None),
        }
    }
}

impl From<amqp_lite_types::Error> for Error {
    fn from(err: amqp_lite_types::Error) -> Self {
        Self::Amqp(err.into())
    }
}

/// Terminal condition of a connection, session or link
#[derive(Debug, Clone, Default)]
pub(crate) struct Terminal {
    pub error: Option<definitions::Error>,
    pub remote: bool,
}

impl Terminal {
    pub fn local(error: Option<definitions::Error>) -> Self {
        Self {
            error,
            remote: false,
        }
    }

    pub fn remote(error: Option<definitions::Error>) -> Self {
        Self {
            error,
            remote: true,
        }
    }

    /// `Ok` unless an error ended the object
    pub fn to_result(&self) -> Result<(), Error> {
        match (&self.error, self.remote) {
            (None, _) => Ok(()),
            (Some(error), true) => Err(Error::Remote(error.clone())),
            (Some(error), false) => Err(Error::Amqp(error.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::definitions::LinkError;

    use super::*;

    #[test]
    fn illegal_state_names_operation_and_state() {
        #[derive(Debug)]
        struct End;

        let err = Error::illegal_state("Close", End);
        assert_eq!(err.condition(), AmqpError::IllegalState.into());
        assert_eq!(
            err.to_string(),
            "amqp:illegal-state: Close is not allowed in state End"
        );
    }

    #[test]
    fn conditions_of_local_variants() {
        assert_eq!(Error::Timeout.condition().as_str(), TIMEOUT);
        assert_eq!(Error::MessageReleased.condition().as_str(), MESSAGE_RELEASED);
        let io = Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(
            io.condition(),
            ErrorCondition::ConnectionError(ConnectionError::ConnectionForced)
        );
    }

    #[test]
    fn codec_errors_become_decode_errors() {
        let err = Error::from(amqp_lite_types::Error::InvalidFormatCode(0xff));
        assert_eq!(err.condition(), AmqpError::DecodeError.into());
    }

    #[test]
    fn terminal_result_keeps_origin() {
        let error = definitions::Error::new(LinkError::DetachForced, None::<String>, None);
        assert!(matches!(
            Terminal::remote(Some(error.clone())).to_result(),
            Err(Error::Remote(_))
        ));
        assert!(matches!(
            Terminal::local(Some(error)).to_result(),
            Err(Error::Amqp(_))
        ));
        assert!(Terminal::remote(None).to_result().is_ok());
    }
}
