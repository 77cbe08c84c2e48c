//! Background tasks that read and write the transport of a connection

use std::{
    io,
    sync::{Arc, Weak},
    time::Duration,
};

use amqp_lite_types::definitions::ConnectionError;
use futures_util::StreamExt;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use super::{heartbeat::HeartBeat, ConnectionInner};
use crate::{
    transport::{recv_protocol_header, write_loop, FrameReader, Outgoing},
    util::Running,
    Error,
};

/// Writes queued frames until the connection ends. A write failure aborts the
/// connection.
pub(crate) async fn write<W>(
    connection: Weak<ConnectionInner>,
    writer: W,
    outgoing: mpsc::UnboundedReceiver<Outgoing>,
) where
    W: AsyncWrite + Unpin,
{
    if let Err(err) = write_loop(writer, outgoing).await {
        if let Some(connection) = connection.upgrade() {
            connection.on_io_error(err);
        }
    }
}

/// Reads the protocol header and then every frame until the connection ends
pub(crate) async fn read<R>(
    connection: Arc<ConnectionInner>,
    mut reader: R,
    idle_time_out: Option<Duration>,
) where
    R: AsyncRead + Unpin,
{
    let mut closed = connection.subscribe_closed();

    let header = tokio::select! {
        header = recv_protocol_header(&mut reader) => header,
        _ = closed.changed() => return,
    };
    let result = header.and_then(|header| connection.on_header(header));
    if let Err(err) = result {
        match err {
            Error::Io(err) => connection.on_io_error(err),
            err => connection.abort(err.to_amqp_error()),
        }
        return;
    }

    let max_frame_size = connection.local_max_frame_size();
    let mut frames = FrameReader::new(reader, max_frame_size, idle_time_out);
    let mut heartbeat = HeartBeat::never();

    loop {
        let running = tokio::select! {
            _ = heartbeat.next() => {
                connection.send_heartbeat();
                Running::Continue
            },
            frame = frames.next() => match frame {
                Some(Ok(frame)) => {
                    let running = connection.on_frame(frame);
                    if let Some(period) = connection.take_heartbeat() {
                        heartbeat = HeartBeat::new(period);
                    }
                    running
                }
                Some(Err(Error::Io(err))) => {
                    connection.on_io_error(err);
                    Running::Stop
                }
                Some(Err(err)) => on_read_error(&connection, err),
                None => {
                    connection.on_io_error(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "transport closed by peer",
                    ));
                    Running::Stop
                }
            },
            _ = closed.changed() => Running::Stop,
        };

        if running == Running::Stop {
            break;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("connection reader stopped");
    #[cfg(feature = "log")]
    log::debug!("connection reader stopped");
}

fn on_read_error(connection: &ConnectionInner, err: Error) -> Running {
    let error = err.to_amqp_error();
    if error.condition == ConnectionError::ConnectionForced.into() {
        // Idle timeout, the peer is presumed dead
        connection.abort(error);
        return Running::Stop;
    }
    connection.on_frame_error(err);
    Running::Continue
}
