use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener},
    thread,
    time::Duration,
};

use chainfeed_network::{Endpoint, tcp::TcpConnector};

fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[test]
fn tcp_roundtrip() {
    let (listener, addr) = local_listener();

    let echo = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        stream.write_all(&buf).unwrap();
        // keep the stream open until the client is done reading
        let _ = stream.read(&mut buf);
    });

    let connector = TcpConnector::default().with_connect_timeout(Duration::from_millis(5000));
    let mut session = connector.connect(&Endpoint::from(addr)).unwrap();
    assert!(session.is_connected());
    assert_eq!(session.peer_addr(), addr);
    assert!(session.state());

    assert!(session.send(b"ping"));
    assert_eq!(session.receive(4).unwrap(), b"ping");

    assert!(session.disconnect());
    echo.join().unwrap();
}

#[test]
fn fragments_are_reassembled_in_order() {
    let (listener, addr) = local_listener();
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let expected = payload.clone();

    let peer = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_nodelay(true).unwrap();
        for chunk in payload.chunks(1337) {
            stream.write_all(chunk).unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        let _ = stream.read(&mut [0u8; 1]);
    });

    let connector = TcpConnector::default()
        .with_connect_timeout(Duration::from_secs(5))
        .with_recv_timeout(Duration::from_secs(5))
        .with_recv_wait_cap(Duration::from_millis(100));
    let mut session = connector.connect(&Endpoint::from(addr)).unwrap();

    let got = session.receive(expected.len()).unwrap();
    assert_eq!(got, expected);

    session.disconnect();
    peer.join().unwrap();
}

#[test]
fn single_fragment_and_split_reads() {
    let (listener, addr) = local_listener();

    let peer = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"hello world").unwrap();
        let _ = stream.read(&mut [0u8; 1]);
    });

    let mut session = TcpConnector::default().connect(&Endpoint::from(addr)).unwrap();

    let mut first = [0u8; 5];
    assert!(session.recv(&mut first));
    assert_eq!(&first, b"hello");

    let mut rest = [0u8; 6];
    session.receive_into(&mut rest).unwrap();
    assert_eq!(&rest, b" world");

    // nothing requested, nothing read
    session.receive_into(&mut []).unwrap();

    drop(session);
    peer.join().unwrap();
}
