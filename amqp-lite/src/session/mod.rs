//! Implements AMQP1.0 Session
//!
//! A session multiplexes links over one channel of a connection and applies
//! the transfer window to every frame its links send.

use std::{collections::HashMap, sync::Arc, time::Duration};

use amqp_lite_types::{
    definitions::{self, Handle, Role, SessionError},
    messaging::{Accepted, DeliveryState, Outcome},
    performatives::{Attach, Begin, Detach, Disposition, End, Flow, Performative, Transfer},
    ByteBuffer, SequenceNumber,
};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    connection::{Connection, ConnectionInner},
    error::Terminal,
    frames::amqp::FrameBody,
    link::{delivery::OutgoingDelivery, LinkInner},
    util::{list::LinkedList, wait_closed, with_timeout},
    Error,
};

mod builder;
pub use builder::*;

/// Default incoming window
pub const DEFAULT_WINDOW: u32 = 2048;

/// Default number of links per session
pub const DEFAULT_HANDLE_MAX: u32 = 8;

/// First transfer id of every session. Close to the wrap around point so that
/// serial number arithmetic is exercised early.
pub(crate) const INITIAL_OUTGOING_ID: u32 = u32::MAX - 2;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing has been sent or received
    Start,
    /// The begin frame has been sent
    BeginSent,
    /// The remote begin frame has been received
    BeginReceived,
    /// Begin frames have been exchanged
    Opened,
    /// The end frame was sent before the remote begin arrived
    EndPipe,
    /// The end frame has been sent
    EndSent,
    /// The remote end frame has been received
    EndReceived,
    /// The session is ended
    End,
}

/// Inputs of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The local begin frame is sent
    SendBegin,
    /// The remote begin frame arrives
    RecvBegin,
    /// The local end frame is sent
    SendEnd,
    /// The remote end frame arrives
    RecvEnd,
}

impl SessionState {
    /// The state after `event`, or an illegal-state error
    pub fn on_event(self, event: SessionEvent) -> Result<Self, Error> {
        use SessionEvent::*;
        use SessionState::*;

        let next = match (self, event) {
            (Start, SendBegin) => BeginSent,
            (BeginReceived, SendBegin) => Opened,
            (Start, RecvBegin) => BeginReceived,
            (BeginSent, RecvBegin) => Opened,
            (EndPipe, RecvBegin) => EndSent,
            (BeginSent, SendEnd) => EndPipe,
            (Opened, SendEnd) => EndSent,
            (EndReceived, SendEnd) => End,
            (Opened, RecvEnd) => EndReceived,
            (EndSent, RecvEnd) => End,
            (state, event) => {
                let operation = match event {
                    SendBegin => "Begin",
                    RecvBegin => "OnBegin",
                    SendEnd => "End",
                    RecvEnd => "OnEnd",
                };
                return Err(Error::illegal_state(operation, state));
            }
        };
        Ok(next)
    }

    /// Whether links may send frames
    pub fn can_send(&self) -> bool {
        matches!(self, SessionState::BeginSent | SessionState::Opened)
    }
}

/// A session on a [`Connection`]
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a builder for [`Session`]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Begins a session with default settings. The begin frame is sent right
    /// away; links may be attached before the peer answers.
    pub fn begin(connection: &Connection) -> Result<Self, Error> {
        Builder::new().begin(connection)
    }

    /// Local channel
    pub fn channel(&self) -> u16 {
        self.inner.channel
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// Remaining outgoing window
    pub fn outgoing_window(&self) -> u32 {
        self.inner.core.lock().outgoing_window
    }

    /// The error that ended the session
    pub fn error(&self) -> Option<definitions::Error> {
        self.inner.core.lock().terminal.error.clone()
    }

    /// Ends the session and waits at most `timeout` for the peer's end frame.
    /// A zero `timeout` does not wait. Ending an ended session is a no-op.
    pub async fn close(
        &self,
        timeout: Duration,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        let closed = self.inner.closed.subscribe();
        self.inner.end(error)?;
        if timeout.is_zero() {
            return Ok(());
        }
        if with_timeout(timeout, wait_closed(closed)).await.is_none() {
            return Err(Error::Timeout);
        }
        let core = self.inner.core.lock();
        match core.terminal.remote {
            true => core.terminal.to_result(),
            false => Ok(()),
        }
    }
}

#[derive(Debug)]
struct IncomingDelivery {
    delivery_id: SequenceNumber,
    handle: Handle,
}

#[derive(Debug)]
pub(crate) struct SessionCore {
    state: SessionState,
    remote_channel: Option<u16>,

    initial_outgoing_id: SequenceNumber,
    next_outgoing_id: SequenceNumber,
    outgoing_window: u32,
    next_incoming_id: Option<SequenceNumber>,
    incoming_window: u32,
    remaining_incoming_window: u32,

    outgoing_delivery_id: SequenceNumber,
    incoming_delivery_id: Option<SequenceNumber>,

    local_links: Vec<Option<Arc<LinkInner>>>,
    remote_links: HashMap<Handle, Arc<LinkInner>>,

    outgoing: LinkedList<OutgoingDelivery>,
    incoming: LinkedList<IncomingDelivery>,

    terminal: Terminal,
}

pub(crate) struct SessionInner {
    pub connection: Arc<ConnectionInner>,
    channel: u16,
    core: Mutex<SessionCore>,
    closed: watch::Sender<bool>,
}

impl std::fmt::Debug for SessionInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInner")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

fn sequence_error(err: amqp_lite_types::Error) -> Error {
    Error::not_allowed(err.to_string())
}

impl SessionInner {
    fn new(
        connection: Arc<ConnectionInner>,
        channel: u16,
        incoming_window: u32,
        handle_max: u32,
    ) -> Self {
        let core = SessionCore {
            state: SessionState::Start,
            remote_channel: None,
            initial_outgoing_id: SequenceNumber::new(INITIAL_OUTGOING_ID),
            next_outgoing_id: SequenceNumber::new(INITIAL_OUTGOING_ID),
            outgoing_window: 0,
            next_incoming_id: None,
            incoming_window,
            remaining_incoming_window: incoming_window,
            outgoing_delivery_id: SequenceNumber::new(0),
            incoming_delivery_id: None,
            local_links: vec![None; handle_max.max(1) as usize],
            remote_links: HashMap::new(),
            outgoing: LinkedList::new(),
            incoming: LinkedList::new(),
            terminal: Terminal::default(),
        };
        let (closed, _) = watch::channel(false);
        Self {
            connection,
            channel,
            core: Mutex::new(core),
            closed,
        }
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }

    pub fn state(&self) -> SessionState {
        self.core.lock().state
    }

    fn send_begin(&self) -> Result<(), Error> {
        let mut core = self.core.lock();
        let next = core.state.on_event(SessionEvent::SendBegin)?;
        let begin = Begin {
            remote_channel: None,
            next_outgoing_id: core.next_outgoing_id.value(),
            incoming_window: core.incoming_window,
            outgoing_window: DEFAULT_WINDOW,
            handle_max: (core.local_links.len() - 1) as u32,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        self.connection.send_performative(self.channel, begin.into())?;
        core.state = next;
        Ok(())
    }

    /// Sends a frame on behalf of a link
    pub fn send_link_frame(&self, performative: Performative) -> Result<(), Error> {
        let core = self.core.lock();
        if !core.state.can_send() {
            return Err(Error::illegal_state(performative.name(), core.state));
        }
        self.connection.send_performative(self.channel, performative)
    }

    /// Fills in the session fields of `flow` and sends it
    pub fn send_flow(&self, mut flow: Flow) -> Result<(), Error> {
        let mut core = self.core.lock();
        if !core.state.can_send() {
            return Err(Error::illegal_state("Flow", core.state));
        }
        Self::send_flow_locked(self, &mut core, &mut flow)
    }

    fn send_flow_locked(&self, core: &mut SessionCore, flow: &mut Flow) -> Result<(), Error> {
        core.remaining_incoming_window = core.incoming_window;
        flow.next_incoming_id = core.next_incoming_id.map(SequenceNumber::value);
        flow.incoming_window = core.incoming_window;
        flow.next_outgoing_id = core.next_outgoing_id.value();
        flow.outgoing_window = DEFAULT_WINDOW;
        self.connection
            .send_performative(self.channel, flow.clone().into())
    }

    pub fn add_link<F>(&self, f: F) -> Result<Arc<LinkInner>, Error>
    where
        F: FnOnce(Handle) -> Arc<LinkInner>,
    {
        let mut core = self.core.lock();
        if !core.state.can_send() {
            return Err(Error::illegal_state("Attach", core.state));
        }
        let handle = core
            .local_links
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| {
                Error::not_allowed(format!(
                    "handle exceeded, at most {} links are allowed",
                    core.local_links.len()
                ))
            })?;
        let link = f(handle as Handle);
        core.local_links[handle] = Some(link.clone());
        Ok(link)
    }

    pub fn remove_link(&self, handle: Handle) {
        let mut core = self.core.lock();
        if let Some(slot) = core.local_links.get_mut(handle as usize) {
            *slot = None;
        }
        core.remote_links
            .retain(|_, link| link.handle != handle);
    }

    /// Drops the deliveries of a link that ended. The outgoing ones are
    /// returned so their senders can be told.
    pub fn take_link_deliveries(&self, handle: Handle) -> Vec<OutgoingDelivery> {
        let mut core = self.core.lock();
        let mut taken = Vec::new();
        let mut cursor = core.outgoing.first();
        while let Some(key) = cursor {
            cursor = core.outgoing.next(key);
            if core.outgoing.get(key).map(|delivery| delivery.handle) == Some(handle) {
                taken.extend(core.outgoing.remove(key));
            }
        }
        core.incoming.retain(|delivery| delivery.handle != handle);
        taken
    }

    /// Queues a delivery and writes as much as the window allows
    pub fn send_delivery(&self, mut delivery: OutgoingDelivery) -> Result<(), Error> {
        let mut core = self.core.lock();
        if !core.state.can_send() {
            delivery.complete(Err(Error::illegal_state("Transfer", core.state)));
            return Err(Error::illegal_state("Transfer", core.state));
        }
        core.outgoing.push_back(delivery);
        self.write_pending(&mut core)
    }

    /// Writes transfer frames for queued deliveries while the outgoing window
    /// is open. A fully written settled delivery is done and reported as
    /// accepted.
    fn write_pending(&self, core: &mut SessionCore) -> Result<(), Error> {
        let mut cursor = core.outgoing.first();
        while let Some(key) = cursor {
            cursor = core.outgoing.next(key);

            loop {
                let delivery = match core.outgoing.get_mut(key) {
                    Some(delivery) if !delivery.written => delivery,
                    _ => break,
                };
                if core.outgoing_window == 0 {
                    return Ok(());
                }

                let mut transfer = Transfer {
                    handle: delivery.handle,
                    ..Default::default()
                };
                if delivery.delivery_id.is_none() {
                    let delivery_id = core.outgoing_delivery_id.increment();
                    delivery.delivery_id = Some(delivery_id);
                    transfer.delivery_id = Some(delivery_id.value());
                    transfer.delivery_tag = Some(delivery.tag.clone());
                    transfer.message_format = Some(delivery.message_format);
                    transfer.settled = Some(delivery.settled);
                    transfer.batchable = delivery.batchable;
                }

                self.connection
                    .send_transfer(self.channel, transfer, &mut delivery.payload)?;
                core.outgoing_window -= 1;
                core.next_outgoing_id.increment();

                if delivery.payload.is_empty() {
                    delivery.written = true;
                    if delivery.settled {
                        if let Some(mut delivery) = core.outgoing.remove(key) {
                            delivery.complete(Ok(Outcome::Accepted(Accepted {})));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Disposes an incoming delivery. Unknown ids are ignored so disposing
    /// twice has no effect.
    pub fn dispose_incoming(
        &self,
        delivery_id: SequenceNumber,
        state: DeliveryState,
        settled: bool,
    ) -> Result<bool, Error> {
        let mut core = self.core.lock();
        let key = core
            .incoming
            .iter()
            .find(|(_, delivery)| delivery.delivery_id == delivery_id)
            .map(|(key, _)| key);
        let key = match key {
            Some(key) => key,
            None => return Ok(false),
        };
        if !core.state.can_send() {
            return Err(Error::illegal_state("Disposition", core.state));
        }
        if settled {
            core.incoming.remove(key);
        }
        let disposition = Disposition {
            role: Role::Receiver,
            first: delivery_id.value(),
            last: None,
            settled,
            state: Some(state),
            batchable: false,
        };
        self.connection
            .send_performative(self.channel, disposition.into())?;
        Ok(true)
    }

    pub fn on_begin(&self, remote_channel: u16, begin: Begin) -> Result<(), Error> {
        let mut core = self.core.lock();
        core.state = core.state.on_event(SessionEvent::RecvBegin)?;
        core.remote_channel = Some(remote_channel);
        core.next_incoming_id = Some(SequenceNumber::new(begin.next_outgoing_id));
        core.outgoing_window = begin.incoming_window;
        match core.state {
            SessionState::Opened => self.write_pending(&mut core),
            _ => Ok(()),
        }
    }

    pub fn on_frame(&self, body: FrameBody) -> Result<(), Error> {
        match body {
            FrameBody::Attach(attach) => self.on_attach(attach),
            FrameBody::Flow(flow) => self.on_flow(flow),
            FrameBody::Transfer {
                performative,
                payload,
            } => self.on_transfer(performative, payload),
            FrameBody::Disposition(disposition) => self.on_disposition(disposition),
            FrameBody::Detach(detach) => self.on_detach(detach),
            other => Err(Error::not_allowed(format!(
                "{:?} is not a session frame",
                other
            ))),
        }
    }

    fn on_attach(&self, attach: Attach) -> Result<(), Error> {
        let link = {
            let mut core = self.core.lock();
            let link = core
                .local_links
                .iter()
                .flatten()
                .find(|link| link.name == attach.name)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("no link named {}", attach.name)))?;
            core.remote_links.insert(attach.handle, link.clone());
            link
        };
        link.on_attach(attach)
    }

    fn remote_link(&self, handle: Handle) -> Result<Arc<LinkInner>, Error> {
        self.core
            .lock()
            .remote_links
            .get(&handle)
            .cloned()
            .ok_or_else(|| {
                Error::amqp(
                    SessionError::UnattachedHandle,
                    format!("handle {} is not attached", handle),
                )
            })
    }

    fn on_flow(&self, flow: Flow) -> Result<(), Error> {
        let link = {
            let mut core = self.core.lock();
            let next_incoming_id = flow
                .next_incoming_id
                .map(SequenceNumber::new)
                .unwrap_or(core.initial_outgoing_id);
            let window = (next_incoming_id + flow.incoming_window) - core.next_outgoing_id;
            core.outgoing_window = window.max(0) as u32;
            if core.outgoing_window > 0 {
                self.write_pending(&mut core)?;
            }

            match flow.handle {
                Some(handle) => Some(
                    core.remote_links
                        .get(&handle)
                        .cloned()
                        .ok_or_else(|| {
                            Error::amqp(
                                SessionError::UnattachedHandle,
                                format!("handle {} is not attached", handle),
                            )
                        })?,
                ),
                None => {
                    if flow.echo && core.state.can_send() {
                        self.send_flow_locked(&mut core, &mut Flow::default())?;
                    }
                    None
                }
            }
        };
        match link {
            Some(link) => link.on_flow(&flow),
            None => Ok(()),
        }
    }

    fn on_transfer(&self, transfer: Transfer, payload: ByteBuffer) -> Result<(), Error> {
        let link = {
            let mut core = self.core.lock();
            match core.state {
                SessionState::Opened => {}
                // The peer has not seen our end yet
                SessionState::EndSent | SessionState::EndPipe => return Ok(()),
                state => return Err(Error::illegal_state("OnTransfer", state)),
            }

            let next_incoming_id = core
                .next_incoming_id
                .ok_or_else(|| Error::illegal_state("OnTransfer", core.state))?;
            core.next_incoming_id = Some(next_incoming_id + 1);
            if core.remaining_incoming_window == 0 {
                return Err(Error::amqp(
                    SessionError::WindowViolation,
                    "transfer beyond the incoming window",
                ));
            }
            core.remaining_incoming_window -= 1;

            if let Some(delivery_id) = transfer.delivery_id.map(SequenceNumber::new) {
                let is_new = match core.incoming_delivery_id {
                    Some(last) => delivery_id.is_after(last).map_err(sequence_error)?,
                    None => true,
                };
                if is_new {
                    core.incoming_delivery_id = Some(delivery_id);
                    if !transfer.settled.unwrap_or(false) {
                        core.incoming.push_back(IncomingDelivery {
                            delivery_id,
                            handle: transfer.handle,
                        });
                    }
                }
            }
            if transfer.aborted {
                if let Some(delivery_id) = core.incoming_delivery_id {
                    core.incoming
                        .retain(|delivery| delivery.delivery_id != delivery_id);
                }
            }

            let link = core.remote_links.get(&transfer.handle).cloned().ok_or_else(|| {
                Error::amqp(
                    SessionError::UnattachedHandle,
                    format!("handle {} is not attached", transfer.handle),
                )
            })?;

            if core.remaining_incoming_window < core.incoming_window / 2 {
                self.send_flow_locked(&mut core, &mut Flow::default())?;
            }
            link
        };
        link.on_transfer(transfer, payload)
    }

    fn on_disposition(&self, disposition: Disposition) -> Result<(), Error> {
        let first = SequenceNumber::new(disposition.first);
        let last = disposition.last.map(SequenceNumber::new).unwrap_or(first);

        let mut core = self.core.lock();
        match disposition.role {
            // Outcomes of our deliveries
            Role::Receiver => {
                let mut cursor = core.outgoing.first();
                while let Some(key) = cursor {
                    cursor = core.outgoing.next(key);
                    let delivery_id = match core.outgoing.get(key).and_then(|d| d.delivery_id) {
                        Some(delivery_id) => delivery_id,
                        None => break,
                    };
                    if delivery_id.is_before(first).map_err(sequence_error)? {
                        continue;
                    }
                    if delivery_id.is_after(last).map_err(sequence_error)? {
                        break;
                    }

                    let terminal = disposition
                        .state
                        .as_ref()
                        .map(DeliveryState::is_terminal)
                        .unwrap_or(false);
                    if !disposition.settled && !terminal {
                        continue;
                    }

                    if !disposition.settled {
                        let settle = Disposition {
                            role: Role::Sender,
                            first: delivery_id.value(),
                            last: None,
                            settled: true,
                            state: disposition.state.clone(),
                            batchable: false,
                        };
                        self.connection
                            .send_performative(self.channel, settle.into())?;
                    }

                    let outcome = disposition
                        .state
                        .clone()
                        .and_then(DeliveryState::into_outcome)
                        .unwrap_or(Outcome::Accepted(Accepted {}));
                    if let Some(mut delivery) = core.outgoing.remove(key) {
                        delivery.complete(Ok(outcome));
                    }
                }
            }
            // The sender settled deliveries we received
            Role::Sender => {
                if disposition.settled {
                    let mut result = Ok(());
                    core.incoming.retain(|delivery| {
                        let before = delivery.delivery_id.is_before(first);
                        let after = delivery.delivery_id.is_after(last);
                        match (before, after) {
                            (Ok(before), Ok(after)) => before || after,
                            (Err(err), _) | (_, Err(err)) => {
                                result = Err(sequence_error(err));
                                true
                            }
                        }
                    });
                    result?;
                }
            }
        }
        Ok(())
    }

    fn on_detach(&self, detach: Detach) -> Result<(), Error> {
        let link = self.remote_link(detach.handle)?;
        link.on_detach(detach)?;
        self.remove_link(link.handle);
        Ok(())
    }

    pub fn on_end(&self, end: End) -> Result<(), Error> {
        let (links, deliveries) = {
            let mut core = self.core.lock();
            let next = core.state.on_event(SessionEvent::RecvEnd)?;
            if end.error.is_some() || next == SessionState::EndReceived {
                core.terminal = Terminal::remote(end.error);
            }
            core.state = next;
            if next == SessionState::EndReceived {
                let next = core.state.on_event(SessionEvent::SendEnd)?;
                self.connection
                    .send_performative(self.channel, End { error: None }.into())?;
                core.state = next;
            }
            Self::take_children(&mut core)
        };
        self.on_ended(links, deliveries);
        Ok(())
    }

    /// Sends the end frame. Ending an ended session is a no-op.
    pub fn end(&self, error: Option<definitions::Error>) -> Result<(), Error> {
        let (links, deliveries) = {
            let mut core = self.core.lock();
            if core.state == SessionState::End {
                return Ok(());
            }
            let next = core.state.on_event(SessionEvent::SendEnd)?;
            self.connection.send_performative(
                self.channel,
                End {
                    error: error.clone(),
                }
                .into(),
            )?;
            if error.is_some() {
                core.terminal = Terminal::local(error);
            }
            core.state = next;
            if next != SessionState::End {
                return Ok(());
            }
            Self::take_children(&mut core)
        };
        self.on_ended(links, deliveries);
        if let Some(remote_channel) = self.core.lock().remote_channel {
            self.connection.remove_session(self.channel, Some(remote_channel));
        }
        Ok(())
    }

    /// Forces the session to end, used when the connection goes away
    pub fn abort(&self, error: definitions::Error) {
        let (links, deliveries) = {
            let mut core = self.core.lock();
            if core.state == SessionState::End {
                return;
            }
            core.state = SessionState::End;
            core.terminal = Terminal::local(Some(error));
            Self::take_children(&mut core)
        };
        self.on_ended(links, deliveries);
    }

    fn take_children(core: &mut SessionCore) -> (Vec<Arc<LinkInner>>, Vec<OutgoingDelivery>) {
        if core.state != SessionState::End {
            return (Vec::new(), Vec::new());
        }
        core.remote_links.clear();
        core.incoming.drain();
        let links = core.local_links.iter_mut().filter_map(Option::take).collect();
        (links, core.outgoing.drain())
    }

    fn on_ended(&self, links: Vec<Arc<LinkInner>>, deliveries: Vec<OutgoingDelivery>) {
        let error = self.core.lock().terminal.error.clone().unwrap_or_else(|| {
            definitions::Error::new(
                SessionError::ErrantLink,
                Some(String::from("session ended")),
                None,
            )
        });
        for link in links {
            link.abort(error.clone());
        }
        for delivery in deliveries {
            delivery.abort(&error);
        }
        self.closed.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::definitions::AmqpError;

    use super::*;

    #[test]
    fn session_transitions() {
        use SessionEvent::*;

        let mut state = SessionState::Start;
        for event in [SendBegin, RecvBegin, SendEnd, RecvEnd] {
            state = state.on_event(event).unwrap();
        }
        assert_eq!(state, SessionState::End);

        let mut state = SessionState::Start;
        for event in [SendBegin, RecvBegin, RecvEnd, SendEnd] {
            state = state.on_event(event).unwrap();
        }
        assert_eq!(state, SessionState::End);

        let mut state = SessionState::Start;
        for (event, expected) in [
            (SendBegin, SessionState::BeginSent),
            (SendEnd, SessionState::EndPipe),
            (RecvBegin, SessionState::EndSent),
            (RecvEnd, SessionState::End),
        ] {
            state = state.on_event(event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn ended_session_rejects_everything() {
        use SessionEvent::*;

        for event in [SendBegin, RecvBegin, SendEnd, RecvEnd] {
            let err = SessionState::End.on_event(event).unwrap_err();
            assert_eq!(err.condition(), AmqpError::IllegalState.into());
        }
        assert!(!SessionState::EndSent.can_send());
        assert!(SessionState::BeginSent.can_send());
    }
}
