//! Message format

use uuid::Uuid;

use crate::{
    codec::{read_value, write_value, Composite, FieldReader, FromValue},
    definitions::Milliseconds,
    primitives::{
        Binary, Described, Descriptor, DescriptorDef, OrderedMap, Symbol, Timestamp, Value,
    },
    ByteBuffer, Error,
};

/// Annotations keyed by symbol
pub type Annotations = OrderedMap<Symbol, Value>;

/// Application properties keyed by string
pub type ApplicationProperties = OrderedMap<String, Value>;

const DELIVERY_ANNOTATIONS: DescriptorDef =
    DescriptorDef::new("amqp:delivery-annotations:map", 0x71);
const MESSAGE_ANNOTATIONS: DescriptorDef = DescriptorDef::new("amqp:message-annotations:map", 0x72);
const APPLICATION_PROPERTIES: DescriptorDef =
    DescriptorDef::new("amqp:application-properties:map", 0x74);
const DATA: DescriptorDef = DescriptorDef::new("amqp:data:binary", 0x75);
const AMQP_SEQUENCE: DescriptorDef = DescriptorDef::new("amqp:amqp-sequence:list", 0x76);
const AMQP_VALUE: DescriptorDef = DescriptorDef::new("amqp:value:*", 0x77);
const FOOTER: DescriptorDef = DescriptorDef::new("amqp:footer:map", 0x78);

/// Transport headers for a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Specify durability requirements
    pub durable: bool,

    /// Relative message priority, defaults to 4
    pub priority: u8,

    /// Time to live in milliseconds
    pub ttl: Option<Milliseconds>,

    /// Whether this message has not been acquired by any other link
    pub first_acquirer: bool,

    /// The number of prior unsuccessful delivery attempts
    pub delivery_count: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            durable: false,
            priority: 4,
            ttl: None,
            first_acquirer: false,
            delivery_count: 0,
        }
    }
}

impl Composite for Header {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:header:list", 0x70);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.durable.into(),
            self.priority.into(),
            self.ttl.into(),
            self.first_acquirer.into(),
            self.delivery_count.into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            durable: fields.or(false)?,
            priority: fields.or(4)?,
            ttl: fields.next()?,
            first_acquirer: fields.or(false)?,
            delivery_count: fields.or(0)?,
        })
    }
}

/// Identifier of a message, or of the message a reply correlates to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// ulong
    ULong(u64),
    /// uuid
    Uuid(Uuid),
    /// binary
    Binary(Binary),
    /// string
    String(String),
}

impl From<MessageId> for Value {
    fn from(value: MessageId) -> Self {
        match value {
            MessageId::ULong(v) => Value::ULong(v),
            MessageId::Uuid(v) => Value::Uuid(v),
            MessageId::Binary(v) => Value::Binary(v),
            MessageId::String(v) => Value::String(v),
        }
    }
}

impl FromValue for MessageId {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::ULong(v) => Ok(MessageId::ULong(v)),
            Value::Uuid(v) => Ok(MessageId::Uuid(v)),
            Value::Binary(v) => Ok(MessageId::Binary(v)),
            Value::String(v) => Ok(MessageId::String(v)),
            other => Err(Error::InvalidValue {
                expected: "message-id",
                found: other.type_name(),
            }),
        }
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        MessageId::String(value.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        MessageId::ULong(value)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        MessageId::Uuid(value)
    }
}

/// Immutable properties of the message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    /// Application message identifier
    pub message_id: Option<MessageId>,
    /// Creating user id
    pub user_id: Option<Binary>,
    /// The address of the node the message is destined for
    pub to: Option<String>,
    /// The subject of the message
    pub subject: Option<String>,
    /// The node to send replies to
    pub reply_to: Option<String>,
    /// Application correlation identifier
    pub correlation_id: Option<MessageId>,
    /// MIME content type
    pub content_type: Option<Symbol>,
    /// MIME content encoding
    pub content_encoding: Option<Symbol>,
    /// The time when this message is considered expired
    pub absolute_expiry_time: Option<Timestamp>,
    /// The time when this message was created
    pub creation_time: Option<Timestamp>,
    /// The group this message belongs to
    pub group_id: Option<String>,
    /// The relative position of this message within its group
    pub group_sequence: Option<u32>,
    /// The group the reply message belongs to
    pub reply_to_group_id: Option<String>,
}

impl Composite for Properties {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:properties:list", 0x73);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.message_id.clone().into(),
            self.user_id.clone().into(),
            self.to.clone().into(),
            self.subject.clone().into(),
            self.reply_to.clone().into(),
            self.correlation_id.clone().into(),
            self.content_type.clone().into(),
            self.content_encoding.clone().into(),
            self.absolute_expiry_time.into(),
            self.creation_time.into(),
            self.group_id.clone().into(),
            self.group_sequence.into(),
            self.reply_to_group_id.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            message_id: fields.next()?,
            user_id: fields.next()?,
            to: fields.next()?,
            subject: fields.next()?,
            reply_to: fields.next()?,
            correlation_id: fields.next()?,
            content_type: fields.next()?,
            content_encoding: fields.next()?,
            absolute_expiry_time: fields.next()?,
            creation_time: fields.next()?,
            group_id: fields.next()?,
            group_sequence: fields.next()?,
            reply_to_group_id: fields.next()?,
        })
    }
}

/// The application data section of a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body section
    #[default]
    Empty,

    /// A single AMQP value
    Value(Value),

    /// Opaque binary data
    Data(Binary),

    /// A list of AMQP values
    Sequence(Vec<Value>),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Value(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Value(Value::from(value))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Value(Value::String(value))
    }
}

impl From<Binary> for Body {
    fn from(value: Binary) -> Self {
        Body::Data(value)
    }
}

/// An annotated message.
///
/// Sections are written in the order header, delivery annotations, message
/// annotations, properties, application properties, body, footer. They may
/// arrive in any order but at most one body section is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Header section
    pub header: Option<Header>,

    /// Delivery annotations section
    pub delivery_annotations: Option<Annotations>,

    /// Message annotations section
    pub message_annotations: Option<Annotations>,

    /// Properties section
    pub properties: Option<Properties>,

    /// Application properties section
    pub application_properties: Option<ApplicationProperties>,

    /// Body section
    pub body: Body,

    /// Footer section
    pub footer: Option<Annotations>,
}

impl Message {
    /// Creates a message with only a body
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Creates a [`Builder`]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The body if it is an AMQP value
    pub fn value(&self) -> Option<&Value> {
        match &self.body {
            Body::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The body if it is a data section
    pub fn data(&self) -> Option<&Binary> {
        match &self.body {
            Body::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Encodes the message into a new auto-growing buffer
    pub fn encode(&self) -> Result<ByteBuffer, Error> {
        let mut buffer = ByteBuffer::new(128, true);
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Appends all present sections to `buffer`
    pub fn encode_into(&self, buffer: &mut ByteBuffer) -> Result<(), Error> {
        if let Some(header) = &self.header {
            header.encode(buffer)?;
        }
        if let Some(annotations) = &self.delivery_annotations {
            write_section(buffer, DELIVERY_ANNOTATIONS, annotations.clone().into())?;
        }
        if let Some(annotations) = &self.message_annotations {
            write_section(buffer, MESSAGE_ANNOTATIONS, annotations.clone().into())?;
        }
        if let Some(properties) = &self.properties {
            properties.encode(buffer)?;
        }
        if let Some(properties) = &self.application_properties {
            write_section(buffer, APPLICATION_PROPERTIES, properties.clone().into())?;
        }
        match &self.body {
            Body::Empty => {}
            Body::Value(value) => write_section(buffer, AMQP_VALUE, value.clone())?,
            Body::Data(data) => write_section(buffer, DATA, Value::Binary(data.clone()))?,
            Body::Sequence(items) => {
                write_section(buffer, AMQP_SEQUENCE, Value::List(items.clone()))?
            }
        }
        if let Some(footer) = &self.footer {
            write_section(buffer, FOOTER, footer.clone().into())?;
        }
        Ok(())
    }

    /// Decodes all sections remaining in `buffer`
    pub fn decode(buffer: &mut ByteBuffer) -> Result<Self, Error> {
        let mut message = Message::default();
        let mut has_body = false;
        while !buffer.is_empty() {
            let described = match read_value(buffer)? {
                Value::Described(described) => *described,
                other => {
                    return Err(Error::InvalidValue {
                        expected: "message section",
                        found: other.type_name(),
                    })
                }
            };
            let descriptor = &described.descriptor;
            if Header::DESCRIPTOR.matches(descriptor) {
                message.header = Some(Header::from_described(described)?);
            } else if DELIVERY_ANNOTATIONS.matches(descriptor) {
                message.delivery_annotations = Some(FromValue::from_value(described.value)?);
            } else if MESSAGE_ANNOTATIONS.matches(descriptor) {
                message.message_annotations = Some(FromValue::from_value(described.value)?);
            } else if Properties::DESCRIPTOR.matches(descriptor) {
                message.properties = Some(Properties::from_described(described)?);
            } else if APPLICATION_PROPERTIES.matches(descriptor) {
                message.application_properties = Some(FromValue::from_value(described.value)?);
            } else if FOOTER.matches(descriptor) {
                message.footer = Some(FromValue::from_value(described.value)?);
            } else {
                let body = if AMQP_VALUE.matches(descriptor) {
                    Body::Value(described.value)
                } else if DATA.matches(descriptor) {
                    Body::Data(FromValue::from_value(described.value)?)
                } else if AMQP_SEQUENCE.matches(descriptor) {
                    Body::Sequence(FromValue::from_value(described.value)?)
                } else {
                    return Err(Error::UnknownDescriptor(described.descriptor));
                };
                if has_body {
                    return Err(Error::DuplicateBody);
                }
                has_body = true;
                message.body = body;
            }
        }
        Ok(message)
    }
}

fn write_section(buffer: &mut ByteBuffer, def: DescriptorDef, value: Value) -> Result<(), Error> {
    let described = Described {
        descriptor: Descriptor::Code(def.code),
        value,
    };
    write_value(buffer, &Value::Described(Box::new(described)))
}

/// Builder for [`Message`]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    message: Message,
}

impl Builder {
    /// Sets the header
    pub fn header(mut self, header: Header) -> Self {
        self.message.header = Some(header);
        self
    }

    /// Sets the delivery annotations
    pub fn delivery_annotations(mut self, annotations: Annotations) -> Self {
        self.message.delivery_annotations = Some(annotations);
        self
    }

    /// Sets the message annotations
    pub fn message_annotations(mut self, annotations: Annotations) -> Self {
        self.message.message_annotations = Some(annotations);
        self
    }

    /// Sets the properties
    pub fn properties(mut self, properties: Properties) -> Self {
        self.message.properties = Some(properties);
        self
    }

    /// Sets the application properties
    pub fn application_properties(mut self, properties: ApplicationProperties) -> Self {
        self.message.application_properties = Some(properties);
        self
    }

    /// Sets an AMQP value body
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.message.body = Body::Value(value.into());
        self
    }

    /// Sets a data body
    pub fn data(mut self, data: impl Into<Binary>) -> Self {
        self.message.body = Body::Data(data.into());
        self
    }

    /// Sets an AMQP sequence body
    pub fn sequence(mut self, items: Vec<Value>) -> Self {
        self.message.body = Body::Sequence(items);
        self
    }

    /// Sets the footer
    pub fn footer(mut self, footer: Annotations) -> Self {
        self.message.footer = Some(footer);
        self
    }

    /// Builds the message
    pub fn build(self) -> Message {
        self.message
    }
}
