//! Async driver that runs a [`SessionMachine`] over a real byte stream.

use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf},
    sync::mpsc,
    task::JoinHandle,
    time,
};

use crate::{
    machine::{Action, Event, SessionMachine, State},
    Connector, SessionConfig, SessionError,
};

const QUEUE_DEPTH: usize = 8;

/// How a finished session ended.
#[derive(Debug)]
pub enum Outcome {
    /// The peer answered; the session closed the connection itself.
    Replied(Vec<u8>),
    /// The peer hung up before saying anything.
    PeerClosed,
    Failed(SessionError),
}

/// Summary of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub state: State,
    pub outcome: Outcome,
    /// Number of payload writes attempted.
    pub sends: usize,
    /// Number of times the socket was closed or released.
    pub releases: usize,
    /// Inbound events that arrived after the session had already ended.
    pub ignored: usize,
}

/// What the reader task saw on the socket.
#[derive(Debug)]
enum Inbound {
    Data(Vec<u8>),
    Eof,
    Error(std::io::Error),
}

/// One outbound connection: connect, greet, wait for a reply or hang-up, close.
pub struct Session<S> {
    config: SessionConfig,
    machine: SessionMachine,
    writer: Option<WriteHalf<S>>,
    pump: Option<JoinHandle<()>>,
    sends: usize,
    releases: usize,
    ignored: usize,
    reply: Option<Vec<u8>>,
    error: Option<SessionError>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Create a session and drive it until it reaches a terminal state.
    ///
    /// Never returns an error: failures end up in [`SessionReport::outcome`]
    /// and are logged as they happen.
    pub async fn create<C>(connector: &C, config: SessionConfig) -> SessionReport
    where
        C: Connector<Stream = S> + ?Sized,
    {
        let mut session = Self {
            machine: SessionMachine::new(&config),
            config,
            writer: None,
            pump: None,
            sends: 0,
            releases: 0,
            ignored: 0,
            reply: None,
            error: None,
        };

        let stream = match session.machine.start().action {
            Some(Action::Connect(addr)) => session.connect(connector, addr).await,
            _ => None,
        };
        if let Some(stream) = stream {
            session.run(stream).await;
        }
        session.into_report()
    }

    async fn connect<C>(&mut self, connector: &C, addr: SocketAddr) -> Option<S>
    where
        C: Connector<Stream = S> + ?Sized,
    {
        debug!("connecting to {addr}");
        let attempt = connector.connect(addr);
        let result = match self.config.connect_timeout {
            Some(after) => match time::timeout(after, attempt).await {
                Ok(res) => res.map_err(|source| SessionError::Connect { addr, source }),
                Err(_) => Err(SessionError::ConnectTimeout { addr, after }),
            },
            None => attempt
                .await
                .map_err(|source| SessionError::Connect { addr, source }),
        };
        match result {
            Ok(stream) => Some(stream),
            Err(err) => {
                error!("{err}");
                self.machine.handle(Event::ConnectFailed);
                self.error = Some(err);
                None
            }
        }
    }

    async fn run(&mut self, stream: S) {
        let (reader, writer) = tokio::io::split(stream);
        self.writer = Some(writer);

        let connected = self.machine.handle(Event::Connected);
        info!("Connected");
        if let Some(Action::Send(payload)) = connected.action {
            if let Err(err) = self.send(&payload).await {
                warn!("{err}");
                self.error = Some(err);
                let failed = self.machine.handle(Event::TransportFailed);
                self.execute(failed.action).await;
                return;
            }
        }

        // Reading starts only once the greeting is out.
        let (tx, mut rx) = mpsc::channel(QUEUE_DEPTH);
        self.pump = Some(tokio::spawn(pump(reader, tx, self.config.read_buffer)));
        while let Some(inbound) = rx.recv().await {
            self.dispatch(inbound).await;
        }
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), SessionError> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        self.sends += 1;
        writer.write_all(payload).await.map_err(SessionError::Write)?;
        writer.flush().await.map_err(SessionError::Write)
    }

    async fn dispatch(&mut self, inbound: Inbound) {
        let transition = match &inbound {
            Inbound::Data(bytes) => self.machine.handle(Event::Data(bytes.clone())),
            Inbound::Eof => self.machine.handle(Event::PeerClosed),
            Inbound::Error(_) => self.machine.handle(Event::TransportFailed),
        };
        if transition.is_noop() {
            self.ignored += 1;
            debug!("ignoring {inbound:?} in state {:?}", transition.from);
            return;
        }
        match inbound {
            Inbound::Data(bytes) => {
                info!("Received: {}", String::from_utf8_lossy(&bytes));
                self.reply = Some(bytes);
            }
            Inbound::Eof => debug!("peer closed the connection"),
            Inbound::Error(err) => {
                let err = SessionError::Read(err);
                warn!("{err}");
                self.error = Some(err);
            }
        }
        self.execute(transition.action).await;
    }

    async fn execute(&mut self, action: Option<Action>) {
        let initiated = match action {
            Some(Action::Close) => true,
            Some(Action::Release) => false,
            _ => return,
        };
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        if initiated {
            if let Err(err) = writer.shutdown().await {
                debug!("shutdown after reply: {err}");
            }
        }
        drop(writer);
        self.releases += 1;
        info!("Connection closed");
    }

    fn into_report(self) -> SessionReport {
        let outcome = match (self.reply, self.error) {
            (Some(reply), _) => Outcome::Replied(reply),
            (None, Some(err)) => Outcome::Failed(err),
            (None, None) => Outcome::PeerClosed,
        };
        SessionReport {
            state: self.machine.state(),
            outcome,
            sends: self.sends,
            releases: self.releases,
            ignored: self.ignored,
        }
    }
}

/// Turn socket reads into queued events until EOF or an error.
async fn pump<R>(mut reader: R, tx: mpsc::Sender<Inbound>, capacity: usize)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; capacity.max(1)];
    loop {
        let inbound = match reader.read(&mut buf).await {
            Ok(0) => Inbound::Eof,
            Ok(n) => Inbound::Data(buf[..n].to_vec()),
            Err(err) => Inbound::Error(err),
        };
        let last = !matches!(inbound, Inbound::Data(_));
        if tx.send(inbound).await.is_err() || last {
            break;
        }
    }
}
