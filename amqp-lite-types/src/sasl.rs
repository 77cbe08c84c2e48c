//! SASL frame bodies exchanged before the AMQP protocol header

use crate::{
    codec::{read_value, Composite, FieldReader, FromValue},
    primitives::{Binary, DescriptorDef, Symbol, Value},
    ByteBuffer, Error,
};

/// Advertise available SASL mechanisms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslMechanisms {
    /// Supported SASL mechanisms
    pub sasl_server_mechanisms: Vec<Symbol>,
}

/// Initiate SASL exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslInit {
    /// Selected security mechanism
    pub mechanism: Symbol,
    /// Security response data
    pub initial_response: Option<Binary>,
    /// The name of the target host
    pub hostname: Option<String>,
}

/// Security mechanism challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslChallenge {
    /// Security challenge data
    pub challenge: Binary,
}

/// Security mechanism response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslResponse {
    /// Security response data
    pub response: Binary,
}

/// Indicates the outcome of the SASL dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaslOutcome {
    /// Indicates the outcome of the SASL dialog
    pub code: SaslCode,
    /// Additional data as specified in RFC-4422
    pub additional_data: Option<Binary>,
}

/// Codes to indicate the outcome of the SASL dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslCode {
    /// Connection authentication succeeded
    Ok = 0,
    /// Connection authentication failed due to an unspecified problem with the
    /// supplied credentials
    Auth = 1,
    /// Connection authentication failed due to a system error
    Sys = 2,
    /// Connection authentication failed due to a system error that is unlikely
    /// to be corrected without intervention
    SysPerm = 3,
    /// Connection authentication failed due to a transient system error
    SysTemp = 4,
}

impl From<SaslCode> for Value {
    fn from(value: SaslCode) -> Self {
        Value::UByte(value as u8)
    }
}

impl FromValue for SaslCode {
    fn from_value(value: Value) -> Result<Self, Error> {
        match u8::from_value(value)? {
            0 => Ok(SaslCode::Ok),
            1 => Ok(SaslCode::Auth),
            2 => Ok(SaslCode::Sys),
            3 => Ok(SaslCode::SysPerm),
            4 => Ok(SaslCode::SysTemp),
            _ => Err(Error::InvalidValue {
                expected: "sasl-code",
                found: "ubyte",
            }),
        }
    }
}

impl Composite for SaslMechanisms {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:sasl-mechanisms:list", 0x40);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.sasl_server_mechanisms.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            sasl_server_mechanisms: fields.required()?,
        })
    }
}

impl Composite for SaslInit {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:sasl-init:list", 0x41);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.mechanism.clone().into(),
            self.initial_response.clone().into(),
            self.hostname.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            mechanism: fields.required()?,
            initial_response: fields.next()?,
            hostname: fields.next()?,
        })
    }
}

impl Composite for SaslChallenge {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:sasl-challenge:list", 0x42);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.challenge.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            challenge: fields.required()?,
        })
    }
}

impl Composite for SaslResponse {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:sasl-response:list", 0x43);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.response.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            response: fields.required()?,
        })
    }
}

impl Composite for SaslOutcome {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:sasl-outcome:list", 0x44);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.code.into(), self.additional_data.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            code: fields.required()?,
            additional_data: fields.next()?,
        })
    }
}

/// Body of a SASL frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaslFrameBody {
    /// sasl-mechanisms
    Mechanisms(SaslMechanisms),
    /// sasl-init
    Init(SaslInit),
    /// sasl-challenge
    Challenge(SaslChallenge),
    /// sasl-response
    Response(SaslResponse),
    /// sasl-outcome
    Outcome(SaslOutcome),
}

impl SaslFrameBody {
    /// Writes the body as a described list
    pub fn encode(&self, buffer: &mut ByteBuffer) -> Result<(), Error> {
        match self {
            SaslFrameBody::Mechanisms(b) => b.encode(buffer),
            SaslFrameBody::Init(b) => b.encode(buffer),
            SaslFrameBody::Challenge(b) => b.encode(buffer),
            SaslFrameBody::Response(b) => b.encode(buffer),
            SaslFrameBody::Outcome(b) => b.encode(buffer),
        }
    }

    /// Reads a SASL frame body
    pub fn decode(buffer: &mut ByteBuffer) -> Result<Self, Error> {
        let described = match read_value(buffer)? {
            Value::Described(described) => *described,
            other => {
                return Err(Error::InvalidValue {
                    expected: "sasl frame body",
                    found: other.type_name(),
                })
            }
        };
        let descriptor = &described.descriptor;
        if SaslMechanisms::DESCRIPTOR.matches(descriptor) {
            SaslMechanisms::from_described(described).map(SaslFrameBody::Mechanisms)
        } else if SaslInit::DESCRIPTOR.matches(descriptor) {
            SaslInit::from_described(described).map(SaslFrameBody::Init)
        } else if SaslChallenge::DESCRIPTOR.matches(descriptor) {
            SaslChallenge::from_described(described).map(SaslFrameBody::Challenge)
        } else if SaslResponse::DESCRIPTOR.matches(descriptor) {
            SaslResponse::from_described(described).map(SaslFrameBody::Response)
        } else if SaslOutcome::DESCRIPTOR.matches(descriptor) {
            SaslOutcome::from_described(described).map(SaslFrameBody::Outcome)
        } else {
            Err(Error::UnknownDescriptor(described.descriptor))
        }
    }
}
