use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::Fields,
    primitives::{DescriptorDef, OrderedMap, Symbol, Value},
    Error,
};

use super::Outcome;

/// Filters applied at the source, keyed by filter name
pub type FilterSet = OrderedMap<Symbol, Value>;

/// The source of messages for a link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    /// The address of the source
    pub address: Option<String>,

    /// Indicates the durability of the terminus
    pub durable: u32,

    /// The expiry policy of the source
    pub expiry_policy: Option<Symbol>,

    /// Duration that an expiring source will be retained, in seconds
    pub timeout: u32,

    /// Request dynamic creation of a remote node
    pub dynamic: bool,

    /// Properties of the dynamically created node
    pub dynamic_node_properties: Option<Fields>,

    /// The distribution mode of the link
    pub distribution_mode: Option<Symbol>,

    /// A set of predicates to filter the messages admitted onto the link
    pub filter: Option<FilterSet>,

    /// Default outcome for unsettled transfers
    pub default_outcome: Option<Outcome>,

    /// Descriptors for the outcomes that can be chosen on this link
    pub outcomes: Option<Vec<Symbol>>,

    /// The extension capabilities the sender supports or desires
    pub capabilities: Option<Vec<Symbol>>,
}

impl Source {
    /// A source with only an address
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

/// The target for messages on a link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    /// The address of the target
    pub address: Option<String>,

    /// Indicates the durability of the terminus
    pub durable: u32,

    /// The expiry policy of the target
    pub expiry_policy: Option<Symbol>,

    /// Duration that an expiring target will be retained, in seconds
    pub timeout: u32,

    /// Request dynamic creation of a remote node
    pub dynamic: bool,

    /// Properties of the dynamically created node
    pub dynamic_node_properties: Option<Fields>,

    /// The extension capabilities the sender supports or desires
    pub capabilities: Option<Vec<Symbol>>,
}

impl Target {
    /// A target with only an address
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

impl Composite for Source {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:source:list", 0x28);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.address.clone().into(),
            self.durable.into(),
            self.expiry_policy.clone().into(),
            self.timeout.into(),
            self.dynamic.into(),
            self.dynamic_node_properties.clone().into(),
            self.distribution_mode.clone().into(),
            self.filter.clone().into(),
            self.default_outcome.clone().into(),
            self.outcomes.clone().into(),
            self.capabilities.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            address: fields.next()?,
            durable: fields.or(0)?,
            expiry_policy: fields.next()?,
            timeout: fields.or(0)?,
            dynamic: fields.or(false)?,
            dynamic_node_properties: fields.next()?,
            distribution_mode: fields.next()?,
            filter: fields.next()?,
            default_outcome: fields.next()?,
            outcomes: fields.next()?,
            capabilities: fields.next()?,
        })
    }
}

impl Composite for Target {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:target:list", 0x29);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.address.clone().into(),
            self.durable.into(),
            self.expiry_policy.clone().into(),
            self.timeout.into(),
            self.dynamic.into(),
            self.dynamic_node_properties.clone().into(),
            self.capabilities.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            address: fields.next()?,
            durable: fields.or(0)?,
            expiry_policy: fields.next()?,
            timeout: fields.or(0)?,
            dynamic: fields.or(false)?,
            dynamic_node_properties: fields.next()?,
            capabilities: fields.next()?,
        })
    }
}

composite_value!(Source, Target);
