use async_trait::async_trait;
use net::{greet, Connector, Outcome, Session, SessionConfig, SessionError, State, GREETING};
use std::{io, net::SocketAddr, time::Duration};
use tokio::{
    io::{duplex, AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream},
    net::TcpListener,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn read_greeting<R: AsyncRead + Unpin>(peer: &mut R) -> Vec<u8> {
    let mut buf = vec![0u8; GREETING.len()];
    peer.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn reply_closes_from_client_side() {
    init_logs();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let greeting = read_greeting(&mut sock).await;
        sock.write_all(b"ACK").await.unwrap();
        let mut rest = Vec::new();
        sock.read_to_end(&mut rest).await.unwrap();
        (greeting, rest)
    });

    let report = greet(SessionConfig::with_addr(addr)).await;

    assert_eq!(report.state, State::Closed);
    assert!(matches!(report.outcome, Outcome::Replied(ref r) if r == b"ACK"));
    assert_eq!(report.sends, 1);
    assert_eq!(report.releases, 1);

    let (greeting, rest) = server.await.unwrap();
    assert_eq!(greeting, GREETING.as_bytes());
    assert!(rest.is_empty(), "nothing follows the greeting");
}

#[tokio::test]
async fn refused_connection_fails_without_sending() {
    init_logs();
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let report = greet(SessionConfig::with_addr(addr)).await;

    assert_eq!(report.state, State::Failed);
    assert!(matches!(report.outcome, Outcome::Failed(ref e) if e.is_connect()));
    assert_eq!(report.sends, 0);
    assert_eq!(report.releases, 0);
}

#[tokio::test]
async fn peer_hang_up_after_greeting_releases_once() {
    init_logs();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        read_greeting(&mut sock).await
    });

    let report = greet(SessionConfig::with_addr(addr)).await;

    assert_eq!(server.await.unwrap(), GREETING.as_bytes());
    assert_eq!(report.state, State::Closed);
    assert!(matches!(report.outcome, Outcome::PeerClosed));
    assert_eq!(report.sends, 1);
    assert_eq!(report.releases, 1);
}

#[tokio::test]
async fn greeting_goes_out_before_early_reply_is_read() {
    init_logs();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        sock.write_all(b"early").await.unwrap();
        read_greeting(&mut sock).await
    });

    let report = greet(SessionConfig::with_addr(addr)).await;

    assert_eq!(server.await.unwrap(), GREETING.as_bytes());
    assert!(matches!(report.outcome, Outcome::Replied(ref r) if r == b"early"));
    assert_eq!(report.sends, 1);
}

/// In-memory peer that reads the greeting, answers, and hangs up at once.
struct ReplyAndHangUp(&'static [u8]);

#[async_trait]
impl Connector for ReplyAndHangUp {
    type Stream = DuplexStream;

    async fn connect(&self, _addr: SocketAddr) -> io::Result<DuplexStream> {
        let (client, mut peer) = duplex(256);
        let reply = self.0;
        tokio::spawn(async move {
            read_greeting(&mut peer).await;
            peer.write_all(reply).await.unwrap();
        });
        Ok(client)
    }
}

#[tokio::test]
async fn reply_and_hang_up_together_close_once() {
    init_logs();
    let report = Session::create(&ReplyAndHangUp(b"ACK"), SessionConfig::default()).await;

    assert_eq!(report.state, State::Closed);
    assert!(matches!(report.outcome, Outcome::Replied(ref r) if r == b"ACK"));
    assert_eq!(report.sends, 1);
    assert_eq!(report.releases, 1);
    assert!(report.ignored <= 1);
}

/// Peer that is gone before the greeting can be written.
struct AlreadyGone;

#[async_trait]
impl Connector for AlreadyGone {
    type Stream = DuplexStream;

    async fn connect(&self, _addr: SocketAddr) -> io::Result<DuplexStream> {
        let (client, _peer) = duplex(256);
        Ok(client)
    }
}

#[tokio::test]
async fn write_failure_ends_session() {
    init_logs();
    let report = Session::create(&AlreadyGone, SessionConfig::default()).await;

    assert_eq!(report.state, State::Closed);
    assert!(matches!(report.outcome, Outcome::Failed(SessionError::Write(_))));
    assert_eq!(report.sends, 1);
    assert_eq!(report.releases, 1);
}

/// Connection attempt that never resolves.
struct BlackHole;

#[async_trait]
impl Connector for BlackHole {
    type Stream = DuplexStream;

    async fn connect(&self, _addr: SocketAddr) -> io::Result<DuplexStream> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn connect_timeout_is_terminal() {
    init_logs();
    let config = SessionConfig {
        connect_timeout: Some(Duration::from_millis(50)),
        ..SessionConfig::default()
    };

    let report = Session::create(&BlackHole, config).await;

    assert_eq!(report.state, State::Failed);
    assert!(matches!(
        report.outcome,
        Outcome::Failed(SessionError::ConnectTimeout { .. })
    ));
    assert_eq!(report.sends, 0);
    assert_eq!(report.releases, 0);
}
