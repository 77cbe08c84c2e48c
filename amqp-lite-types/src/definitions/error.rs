use std::fmt::Display;

use crate::{
    codec::{composite_value, Composite, FieldReader, FromValue},
    primitives::{DescriptorDef, Symbol, Value},
    Error as CodecError,
};

use super::Fields;

/// Details of an error
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    /// A symbolic value indicating the error condition
    pub condition: ErrorCondition,

    /// Descriptive text about the error condition
    pub description: Option<String>,

    /// Map carrying information about the error condition
    pub info: Option<Fields>,
}

impl Error {
    /// Creates a new error
    pub fn new(
        condition: impl Into<ErrorCondition>,
        description: impl Into<Option<String>>,
        info: Option<Fields>,
    ) -> Self {
        Self {
            condition: condition.into(),
            description: description.into(),
            info,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.condition, description),
            None => write!(f, "{}", self.condition),
        }
    }
}

impl std::error::Error for Error {}

impl Composite for Error {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:error:list", 0x0000_0000_0000_001d);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            Value::Symbol(self.condition.to_symbol()),
            self.description.clone().into(),
            self.info.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, CodecError> {
        Ok(Self {
            condition: fields.required()?,
            description: fields.next()?,
            info: fields.next()?,
        })
    }
}

composite_value!(Error);

macro_rules! condition_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $symbol:literal),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
        }

        impl $name {
            /// The symbolic value of the condition
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $symbol,)*
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ();

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                match value {
                    $($symbol => Ok($name::$variant),)*
                    _ => Err(()),
                }
            }
        }
    };
}

condition_enum! {
    /// Shared error conditions
    AmqpError {
        /// An internal error occurred
        InternalError => "amqp:internal-error",
        /// A peer attempted to work with a remote entity that does not exist
        NotFound => "amqp:not-found",
        /// A peer attempted to work with a remote entity to which it has no access
        UnauthorizedAccess => "amqp:unauthorized-access",
        /// Data could not be decoded
        DecodeError => "amqp:decode-error",
        /// A peer exceeded its resource allocation
        ResourceLimitExceeded => "amqp:resource-limit-exceeded",
        /// The peer tried to use a frame in a manner that is inconsistent with the semantics
        NotAllowed => "amqp:not-allowed",
        /// An invalid field was passed in a frame body
        InvalidField => "amqp:invalid-field",
        /// The peer tried to use functionality that is not implemented in its partner
        NotImplemented => "amqp:not-implemented",
        /// The client attempted to work with a server entity to which it has no access
        /// because another client is working with it
        ResourceLocked => "amqp:resource-locked",
        /// The client made a request that was not allowed because some precondition failed
        PreconditionFailed => "amqp:precondition-failed",
        /// A server entity the client is working with has been deleted
        ResourceDeleted => "amqp:resource-deleted",
        /// The peer sent a frame that is not permitted in the current state
        IllegalState => "amqp:illegal-state",
        /// The peer cannot send a frame because the smallest encoding of the
        /// performative with the currently valid values would be too large
        FrameSizeTooSmall => "amqp:frame-size-too-small",
    }
}

condition_enum! {
    /// Connection error conditions
    ConnectionError {
        /// An operator intervened to close the connection for some reason
        ConnectionForced => "amqp:connection:forced",
        /// A valid frame header cannot be formed from the incoming byte stream
        FramingError => "amqp:connection:framing-error",
        /// The container is no longer available on the current connection
        Redirect => "amqp:connection:redirect",
    }
}

condition_enum! {
    /// Session error conditions
    SessionError {
        /// The peer violated incoming window for the session
        WindowViolation => "amqp:session:window-violation",
        /// Input was received for a link that was detached with an error
        ErrantLink => "amqp:session:errant-link",
        /// An attach was received using a handle that is already in use
        HandleInUse => "amqp:session:handle-in-use",
        /// A frame (other than attach) was received referencing a handle which is
        /// not currently in use
        UnattachedHandle => "amqp:session:unattached-handle",
    }
}

condition_enum! {
    /// Link error conditions
    LinkError {
        /// An operator intervened to detach for some reason
        DetachForced => "amqp:link:detach-forced",
        /// The peer sent more message transfers than currently allowed on the link
        TransferLimitExceeded => "amqp:link:transfer-limit-exceeded",
        /// The peer sent a larger message than is supported on the link
        MessageSizeExceeded => "amqp:link:message-size-exceeded",
        /// The address provided cannot be resolved to a terminus at the current container
        Redirect => "amqp:link:redirect",
        /// The link has been attached elsewhere
        Stolen => "amqp:link:stolen",
    }
}

/// Any error condition, including ones not defined by the protocol
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCondition {
    /// Shared conditions
    AmqpError(AmqpError),
    /// Connection conditions
    ConnectionError(ConnectionError),
    /// Session conditions
    SessionError(SessionError),
    /// Link conditions
    LinkError(LinkError),
    /// Any other symbol
    Custom(Symbol),
}

impl ErrorCondition {
    /// The symbolic value of the condition
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCondition::AmqpError(c) => c.as_str(),
            ErrorCondition::ConnectionError(c) => c.as_str(),
            ErrorCondition::SessionError(c) => c.as_str(),
            ErrorCondition::LinkError(c) => c.as_str(),
            ErrorCondition::Custom(c) => c.as_str(),
        }
    }

    fn to_symbol(&self) -> Symbol {
        Symbol::from(self.as_str())
    }
}

impl Display for ErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Symbol> for ErrorCondition {
    fn from(value: Symbol) -> Self {
        let s = value.as_str();
        if let Ok(c) = AmqpError::try_from(s) {
            ErrorCondition::AmqpError(c)
        } else if let Ok(c) = ConnectionError::try_from(s) {
            ErrorCondition::ConnectionError(c)
        } else if let Ok(c) = SessionError::try_from(s) {
            ErrorCondition::SessionError(c)
        } else if let Ok(c) = LinkError::try_from(s) {
            ErrorCondition::LinkError(c)
        } else {
            ErrorCondition::Custom(value)
        }
    }
}

impl FromValue for ErrorCondition {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Symbol::from_value(value).map(Into::into)
    }
}

impl From<AmqpError> for ErrorCondition {
    fn from(value: AmqpError) -> Self {
        ErrorCondition::AmqpError(value)
    }
}

impl From<ConnectionError> for ErrorCondition {
    fn from(value: ConnectionError) -> Self {
        ErrorCondition::ConnectionError(value)
    }
}

impl From<SessionError> for ErrorCondition {
    fn from(value: SessionError) -> Self {
        ErrorCondition::SessionError(value)
    }
}

impl From<LinkError> for ErrorCondition {
    fn from(value: LinkError) -> Self {
        ErrorCondition::LinkError(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::read_value, ByteBuffer};

    #[test]
    fn condition_from_symbol() {
        let condition = ErrorCondition::from(Symbol::from("amqp:link:transfer-limit-exceeded"));
        assert_eq!(
            condition,
            ErrorCondition::LinkError(LinkError::TransferLimitExceeded)
        );
        let custom = ErrorCondition::from(Symbol::from("com.example:oops"));
        assert_eq!(custom.as_str(), "com.example:oops");
    }

    #[test]
    fn error_round_trip() {
        let error = Error::new(
            ConnectionError::ConnectionForced,
            "gone".to_string(),
            None,
        );
        let mut buf = ByteBuffer::new(0, true);
        error.encode(&mut buf).unwrap();
        let decoded = Error::from_value(read_value(&mut buf).unwrap()).unwrap();
        assert_eq!(decoded, error);
        assert_eq!(decoded.to_string(), "amqp:connection:forced: gone");
    }
}
