#![cfg(unix)]

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::thread;

use bytes::{BufMut, Bytes, BytesMut};
use repe::{
    body_format, make_error_response, ErrorCode, ErrorResponder, Header, Message, MessageFramer,
    MessageReader, MessageWriter, RepeError, HEADER_SIZE, SPEC_MAGIC,
};

fn scenario_bytes() -> Vec<u8> {
    let header = Header {
        length: 60,
        spec: SPEC_MAGIC,
        version: 1,
        notify: 0,
        reserved: 0,
        id: 42,
        query_length: 4,
        body_length: 8,
        query_format: 0,
        body_format: 2,
        ec: 0,
    };
    let mut wire = BytesMut::new();
    header.encode(&mut wire);
    wire.put_slice(b"/sum");
    wire.put_slice(b"{\"a\":12}");
    wire.to_vec()
}

#[test]
fn scenario_message_decodes_from_stream() {
    let (mut left, right) = UnixStream::pair().unwrap();
    left.write_all(&scenario_bytes()).unwrap();

    let mut reader = MessageReader::new(right);
    let message = reader.read_message().unwrap();

    assert_eq!(message.id(), 42);
    assert!(!message.is_error());
    assert_eq!(message.body_format(), body_format::JSON);
    assert_eq!(message.body(), b"{\"a\":12}");
}

#[test]
fn version_gate_answers_requests_only() {
    let mut framer = MessageFramer::new();
    let responder = ErrorResponder::new();

    for (id, notify) in [(7u64, false), (8u64, true)] {
        let message = if notify {
            Message::notify(id, "/x", Bytes::new())
        } else {
            Message::request(id, "/x", Bytes::new())
        };
        let mut wire = message.to_bytes().to_vec();
        wire[10] = 2;
        framer.feed(&wire);
    }

    let first = framer.next_frame().unwrap().unwrap();
    let err = Message::decode(first.clone()).unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::VersionMismatch));
    let response = responder.for_frame(&first, &err).unwrap();
    assert_eq!(response.id(), 7);
    assert_eq!(response.header().ec, 1);

    let second = framer.next_frame().unwrap().unwrap();
    let err = Message::decode(second.clone()).unwrap_err();
    assert!(responder.for_frame(&second, &err).is_none());
}

#[test]
fn pipelined_requests_answered_by_id() {
    let (client, server) = UnixStream::pair().unwrap();

    let handle = thread::spawn(move || {
        let mut reader = MessageReader::new(server.try_clone().unwrap());
        let mut writer = MessageWriter::new(server);
        loop {
            let request = match reader.read_message() {
                Ok(request) => request,
                Err(RepeError::ConnectionClosed) => break,
                Err(err) => panic!("unexpected error: {err}"),
            };
            let response = if request.query() == b"/double" {
                let doubled: Vec<u8> = request.body().iter().map(|b| b.wrapping_mul(2)).collect();
                Message::response(request.header(), doubled, body_format::RAW_BINARY)
            } else {
                make_error_response(
                    request.header(),
                    ErrorCode::MethodNotFound,
                    Some("method not found"),
                )
            };
            if let Some(response) = response {
                writer.write_message(&response).unwrap();
            }
        }
    });

    let mut writer = MessageWriter::new(client.try_clone().unwrap());
    let mut reader = MessageReader::new(client.try_clone().unwrap());

    writer.send(1, "/double", vec![1u8, 2, 3]).unwrap();
    writer
        .write_message(&Message::notify(2, "/double", vec![9u8]))
        .unwrap();
    writer.send(3, "/nope", Bytes::new()).unwrap();
    writer.send(4, "/double", vec![10u8]).unwrap();

    let r1 = reader.read_message().unwrap();
    let r3 = reader.read_message().unwrap();
    let r4 = reader.read_message().unwrap();

    assert_eq!((r1.id(), r1.body()), (1, [2u8, 4, 6].as_ref()));
    assert_eq!(r3.id(), 3);
    assert_eq!(r3.error_code(), ErrorCode::MethodNotFound);
    assert_eq!(r3.error_message(), Some("method not found"));
    assert_eq!((r4.id(), r4.body()), (4, [20u8].as_ref()));

    client.shutdown(std::net::Shutdown::Both).unwrap();
    handle.join().unwrap();
}

#[test]
fn oversized_declaration_closes_stream() {
    let (mut left, right) = UnixStream::pair().unwrap();
    let mut header = Header::new(1);
    header.set_lengths(0, 1 << 30);
    left.write_all(&header.to_bytes()).unwrap();

    let mut reader = MessageReader::new(right);
    let err = reader.read_frame().unwrap_err();
    assert!(matches!(err, RepeError::ResourceLimitExceeded { .. }));
    assert!(err.is_fatal());
    assert!(matches!(reader.read_frame(), Err(RepeError::Desynchronized)));
}

#[test]
fn zero_body_emits_no_body_bytes() {
    let message = Message::request(11, "/status", Bytes::new());
    let wire = message.to_bytes();
    assert_eq!(wire.len(), HEADER_SIZE + "/status".len());

    let mut framer = MessageFramer::new();
    for byte in wire.iter() {
        framer.feed(std::slice::from_ref(byte));
    }
    let decoded = Message::decode(framer.next_frame().unwrap().unwrap()).unwrap();
    assert!(decoded.body().is_empty());
    assert_eq!(decoded, message);
}
