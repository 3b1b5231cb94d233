//! Pure lifecycle state machine for a single greeting session.
//!
//! The machine performs no I/O. The driver in [`crate::session`] feeds it
//! [`Event`]s and carries out whatever [`Action`] each [`Transition`] asks for.

use std::net::SocketAddr;

use crate::SessionConfig;

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    Connected,
    /// Ended after a reply, a peer closure or a post-connect transport error.
    Closed,
    /// The connection attempt itself failed.
    Failed,
}

impl State {
    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Closed | State::Failed)
    }
}

/// Something the transport reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Connected,
    ConnectFailed,
    Data(Vec<u8>),
    PeerClosed,
    TransportFailed,
}

/// Work the driver must perform on the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Connect(SocketAddr),
    Send(Vec<u8>),
    /// Initiator close: shut the socket down and drop it.
    Close,
    /// The peer is already gone; just drop the socket.
    Release,
}

/// Outcome of feeding one event to the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub action: Option<Action>,
}

impl Transition {
    fn stay(state: State) -> Self {
        Self {
            from: state,
            to: state,
            action: None,
        }
    }

    /// True when the event changed nothing.
    pub fn is_noop(&self) -> bool {
        self.from == self.to && self.action.is_none()
    }
}

/// Single-fire lifecycle for one outbound connection.
#[derive(Debug)]
pub struct SessionMachine {
    state: State,
    addr: SocketAddr,
    payload: Vec<u8>,
    sent: bool,
    released: bool,
}

impl SessionMachine {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: State::Idle,
            addr: config.addr,
            payload: config.payload.clone(),
            sent: false,
            released: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Begin the connection attempt. Only meaningful from `Idle`.
    pub fn start(&mut self) -> Transition {
        if self.state != State::Idle {
            return Transition::stay(self.state);
        }
        self.move_to(State::Connecting, Some(Action::Connect(self.addr)))
    }

    /// Feed a transport event and get back the resulting transition.
    pub fn handle(&mut self, event: Event) -> Transition {
        match (self.state, event) {
            (State::Connecting, Event::Connected) if !self.sent => {
                self.sent = true;
                let payload = self.payload.clone();
                self.move_to(State::Connected, Some(Action::Send(payload)))
            }
            (State::Connecting, Event::ConnectFailed) => self.move_to(State::Failed, None),
            (State::Connected, Event::Data(_)) => self.release_with(Action::Close),
            (State::Connected, Event::PeerClosed | Event::TransportFailed) => {
                self.release_with(Action::Release)
            }
            (state, _) => Transition::stay(state),
        }
    }

    fn release_with(&mut self, action: Action) -> Transition {
        if self.released {
            return Transition::stay(self.state);
        }
        self.released = true;
        self.move_to(State::Closed, Some(action))
    }

    fn move_to(&mut self, to: State, action: Option<Action>) -> Transition {
        let from = self.state;
        self.state = to;
        Transition { from, to, action }
    }
}
