//! Builder for [`Connection`]

use std::{sync::Arc, time::Duration};

use amqp_lite_types::{
    definitions::{Fields, Milliseconds, MIN_MAX_FRAME_SIZE},
    performatives::Open,
    primitives::Symbol,
};
use tokio::{net::TcpStream, sync::mpsc};

use super::{pump, Connection, ConnectionInner, DEFAULT_CHANNEL_MAX, DEFAULT_MAX_FRAME_SIZE};
use crate::{sasl_profile::SaslProfile, transport::Transport, Address, Error};

/// Connection builder
#[derive(Debug, Clone)]
pub struct Builder {
    /// The id of the source container, a random UUID by default
    pub container_id: String,

    /// The name of the target host, the host of the address by default
    pub hostname: Option<String>,

    /// Largest frame this side accepts, at least 512
    pub max_frame_size: u32,

    /// Number of sessions the connection can carry
    pub channel_max: u16,

    /// Incoming idle timeout. The peer is asked to send frames at least twice
    /// as often.
    pub idle_time_out: Option<Milliseconds>,

    /// Capabilities offered to the peer
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// Capabilities desired from the peer
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// Connection properties
    pub properties: Option<Fields>,

    /// SASL profile. If unset the user and password of the address are used
    /// with SASL PLAIN.
    pub sasl_profile: Option<SaslProfile>,

    /// Accept any server certificate on `amqps` addresses
    pub disable_server_cert_validation: bool,

    /// Send the open frame without waiting for the remote protocol header
    pub pipelined: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with default settings
    pub fn new() -> Self {
        Self {
            container_id: uuid::Uuid::new_v4().to_string(),
            hostname: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            channel_max: DEFAULT_CHANNEL_MAX,
            idle_time_out: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
            sasl_profile: None,
            disable_server_cert_validation: false,
            pipelined: true,
        }
    }

    /// The id of the source container
    pub fn container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    /// The name of the target host
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Largest frame this side accepts
    pub fn max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = std::cmp::max(MIN_MAX_FRAME_SIZE, max_frame_size);
        self
    }

    /// Number of sessions the connection can carry
    pub fn channel_max(mut self, channel_max: u16) -> Self {
        self.channel_max = channel_max.max(1);
        self
    }

    /// Incoming idle timeout in milliseconds
    pub fn idle_time_out(mut self, idle_time_out: impl Into<Milliseconds>) -> Self {
        self.idle_time_out = Some(idle_time_out.into());
        self
    }

    /// Adds an offered capability
    pub fn add_offered_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.offered_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Adds a desired capability
    pub fn add_desired_capabilities(mut self, capability: impl Into<Symbol>) -> Self {
        self.desired_capabilities
            .get_or_insert_with(Vec::new)
            .push(capability.into());
        self
    }

    /// Connection properties
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// SASL profile
    pub fn sasl_profile(mut self, profile: impl Into<SaslProfile>) -> Self {
        self.sasl_profile = Some(profile.into());
        self
    }

    /// Accept any server certificate on `amqps` addresses
    pub fn disable_server_cert_validation(mut self, disable: bool) -> Self {
        self.disable_server_cert_validation = disable;
        self
    }

    /// Send the open frame without waiting for the remote protocol header
    pub fn pipelined(mut self, pipelined: bool) -> Self {
        self.pipelined = pipelined;
        self
    }

    /// Connects to `address` (`amqp[s]://[user:[password]@]host[:port][/path]`)
    /// and opens the connection
    pub async fn open(self, address: &str) -> Result<Connection, Error> {
        let address = Address::parse(address)?;
        self.open_address(address).await
    }

    /// Connects to a parsed address and opens the connection
    pub async fn open_address(mut self, address: Address) -> Result<Connection, Error> {
        if self.hostname.is_none() {
            self.hostname = Some(address.host.clone());
        }
        if self.sasl_profile.is_none() {
            self.sasl_profile = SaslProfile::try_from(&address).ok();
        }

        let stream = TcpStream::connect((address.host.as_str(), address.port)).await?;
        let _ = stream.set_nodelay(true);

        #[cfg(feature = "tracing")]
        tracing::debug!(host = %address.host, port = address.port, tls = address.use_tls, "connected");
        #[cfg(feature = "log")]
        log::debug!("connected to {}:{} tls={}", address.host, address.port, address.use_tls);

        match address.use_tls {
            true => self.open_tls(stream, &address).await,
            false => self.open_with_stream(stream).await,
        }
    }

    #[cfg(feature = "rustls")]
    async fn open_tls(self, stream: TcpStream, address: &Address) -> Result<Connection, Error> {
        use crate::transport::tls;

        let config = tls::client_config(self.disable_server_cert_validation);
        let tls_stream = tls::connect_tls(stream, &address.host, config).await?;
        self.open_with_stream(tls_stream).await
    }

    #[cfg(not(feature = "rustls"))]
    async fn open_tls(self, _stream: TcpStream, address: &Address) -> Result<Connection, Error> {
        Err(Error::InvalidAddress(format!(
            "{} requires the \"rustls\" feature",
            address
        )))
    }

    /// Opens the connection on an established byte stream, running the SASL
    /// dialog first if a profile is set
    pub async fn open_with_stream<Io>(self, mut stream: Io) -> Result<Connection, Error>
    where
        Io: Transport,
    {
        if let Some(profile) = &self.sasl_profile {
            profile
                .negotiate(&mut stream, self.hostname.as_deref())
                .await?;
        }

        let local_open = Open {
            container_id: self.container_id,
            hostname: self.hostname,
            max_frame_size: self.max_frame_size,
            channel_max: self.channel_max.saturating_sub(1),
            // To avoid spurious timeouts the peer is asked for half the actual threshold
            idle_time_out: self.idle_time_out.map(|v| v / 2),
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: self.offered_capabilities,
            desired_capabilities: self.desired_capabilities,
            properties: self.properties,
        };
        let idle_time_out = self
            .idle_time_out
            .map(|millis| Duration::from_millis(millis as u64));

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ConnectionInner::new(
            local_open,
            self.channel_max,
            self.pipelined,
            outgoing_tx,
        ));
        inner.send_header()?;
        if self.pipelined {
            inner.send_open()?;
        }

        let (reader, writer) = tokio::io::split(stream);
        tokio::spawn(pump::write(Arc::downgrade(&inner), writer, outgoing_rx));
        tokio::spawn(pump::read(inner.clone(), reader, idle_time_out));

        Ok(Connection { inner })
    }
}
