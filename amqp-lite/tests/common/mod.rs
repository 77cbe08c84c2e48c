//! A scripted peer that speaks raw frames over an in-memory stream

#![allow(dead_code)]

use std::time::Duration;

use amqp_lite::{
    frames::amqp::{Frame, FrameBody, FrameEncoder},
    transport::{recv_protocol_header, send_protocol_header, FrameReader, ProtocolHeader},
    types::{
        definitions::{Handle, Role},
        performatives::{Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Transfer},
        ByteBuffer,
    },
    Connection,
};
use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio_util::codec::Encoder;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub struct Peer {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    pub encoder: FrameEncoder,
}

/// Opens a client connection against a fresh peer
pub async fn connect() -> (Connection, Peer) {
    let (client, server) = tokio::io::duplex(256 * 1024);
    let connection = Connection::builder()
        .container_id("client")
        .open_with_stream(client)
        .await
        .unwrap();
    let peer = Peer::accept(server).await;
    (connection, peer)
}

impl Peer {
    pub async fn accept(stream: DuplexStream) -> Self {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let header = recv_protocol_header(&mut reader).await.unwrap();
        assert!(header.is_amqp());
        send_protocol_header(&mut writer, ProtocolHeader::amqp())
            .await
            .unwrap();
        Self {
            reader: FrameReader::new(reader, 1024 * 1024, None),
            writer,
            encoder: FrameEncoder::new(64 * 1024),
        }
    }

    /// Next frame that is not a heartbeat
    pub async fn recv(&mut self) -> Frame {
        loop {
            let frame = tokio::time::timeout(TIMEOUT, self.reader.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .expect("invalid frame");
            if !matches!(frame.body, FrameBody::Empty) {
                return frame;
            }
        }
    }

    /// Next frame if one arrives within `wait`
    pub async fn try_recv(&mut self, wait: Duration) -> Option<Frame> {
        match tokio::time::timeout(wait, self.reader.next()).await {
            Ok(Some(frame)) => Some(frame.unwrap()),
            _ => None,
        }
    }

    pub async fn send(&mut self, channel: u16, body: impl Into<FrameBody>) {
        let mut dst = BytesMut::new();
        self.encoder
            .encode(Frame::new(channel, body), &mut dst)
            .unwrap();
        self.writer.write_all(&dst).await.unwrap();
    }

    /// Sends a delivery, split into as many frames as the encoder requires
    pub async fn send_transfer(&mut self, channel: u16, transfer: Transfer, payload: ByteBuffer) {
        let body = FrameBody::Transfer {
            performative: transfer,
            payload,
        };
        self.send(channel, body).await
    }

    pub async fn recv_open(&mut self) -> Open {
        match self.recv().await.body {
            FrameBody::Open(open) => open,
            other => panic!("expected open, got {:?}", other),
        }
    }

    pub async fn recv_begin(&mut self) -> (u16, Begin) {
        let frame = self.recv().await;
        match frame.body {
            FrameBody::Begin(begin) => (frame.channel, begin),
            other => panic!("expected begin, got {:?}", other),
        }
    }

    pub async fn recv_attach(&mut self) -> Attach {
        match self.recv().await.body {
            FrameBody::Attach(attach) => attach,
            other => panic!("expected attach, got {:?}", other),
        }
    }

    pub async fn recv_flow(&mut self) -> Flow {
        match self.recv().await.body {
            FrameBody::Flow(flow) => flow,
            other => panic!("expected flow, got {:?}", other),
        }
    }

    pub async fn recv_transfer(&mut self) -> (Transfer, ByteBuffer) {
        match self.recv().await.body {
            FrameBody::Transfer {
                performative,
                payload,
            } => (performative, payload),
            other => panic!("expected transfer, got {:?}", other),
        }
    }

    pub async fn recv_disposition(&mut self) -> Disposition {
        match self.recv().await.body {
            FrameBody::Disposition(disposition) => disposition,
            other => panic!("expected disposition, got {:?}", other),
        }
    }

    pub async fn recv_detach(&mut self) -> Detach {
        match self.recv().await.body {
            FrameBody::Detach(detach) => detach,
            other => panic!("expected detach, got {:?}", other),
        }
    }

    pub async fn recv_end(&mut self) -> End {
        match self.recv().await.body {
            FrameBody::End(end) => end,
            other => panic!("expected end, got {:?}", other),
        }
    }

    pub async fn recv_close(&mut self) -> Close {
        match self.recv().await.body {
            FrameBody::Close(close) => close,
            other => panic!("expected close, got {:?}", other),
        }
    }

    /// Answers the client's open
    pub async fn open(&mut self) -> Open {
        let open = self.recv_open().await;
        let reply = Open {
            container_id: String::from("peer"),
            hostname: None,
            max_frame_size: 64 * 1024,
            channel_max: 8,
            idle_time_out: None,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send(0, reply).await;
        open
    }

    /// Answers the client's begin on the same channel number
    pub async fn begin(&mut self, incoming_window: u32) -> (u16, Begin) {
        let (channel, begin) = self.recv_begin().await;
        let reply = Begin {
            remote_channel: Some(channel),
            next_outgoing_id: 1,
            incoming_window,
            outgoing_window: 1000,
            handle_max: 8,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send(channel, reply).await;
        (channel, begin)
    }

    /// Answers the client's attach with the opposite role and the same handle
    pub async fn attach(&mut self, channel: u16) -> Attach {
        let attach = self.recv_attach().await;
        let role = match attach.role {
            Role::Sender => Role::Receiver,
            Role::Receiver => Role::Sender,
        };
        let reply = Attach {
            name: attach.name.clone(),
            handle: attach.handle,
            role,
            snd_settle_mode: attach.snd_settle_mode,
            rcv_settle_mode: attach.rcv_settle_mode,
            source: attach.source.clone(),
            target: attach.target.clone(),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: match role {
                Role::Sender => Some(0),
                Role::Receiver => None,
            },
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.send(channel, reply).await;
        attach
    }

    /// Grants credit to a client sender
    pub async fn grant(
        &mut self,
        channel: u16,
        begin: &Begin,
        handle: Handle,
        delivery_count: u32,
        link_credit: u32,
    ) {
        let flow = Flow {
            next_incoming_id: Some(begin.next_outgoing_id),
            incoming_window: 1000,
            next_outgoing_id: 1,
            outgoing_window: 1000,
            handle: Some(handle),
            delivery_count: Some(delivery_count),
            link_credit: Some(link_credit),
            ..Default::default()
        };
        self.send(channel, flow).await;
    }
}
