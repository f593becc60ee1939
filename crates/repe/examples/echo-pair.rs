//! Echo responder over a Unix socket pair.
//!
//! Run with:
//!   cargo run --example echo-pair
//!
//! The client sends an echo request, a request for an unknown method, a
//! notify, and a request with an unsupported version. The server echoes the
//! first, answers the second and fourth with error responses, and stays
//! silent for the notify.

use std::os::unix::net::UnixStream;
use std::thread;

use bytes::Bytes;
use repe::{
    body_format, ErrorCode, ErrorResponder, Message, MessageReader, MessageWriter, RepeError,
};

fn serve(stream: UnixStream) -> repe::Result<()> {
    let mut reader = MessageReader::new(stream.try_clone()?);
    let mut writer = MessageWriter::new(stream);
    let responder = ErrorResponder::new();

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(RepeError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        };

        let request = match Message::decode(frame.clone()) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request");
                if let Some(response) = responder.for_frame(&frame, &err) {
                    writer.write_message(&response)?;
                }
                continue;
            }
        };

        let response = match request.query() {
            b"/echo" => Message::response(
                request.header(),
                request.body().to_vec(),
                request.body_format(),
            ),
            other => {
                let text = format!("unknown method {}", String::from_utf8_lossy(other));
                responder.for_message(&request, ErrorCode::MethodNotFound, Some(&text))
            }
        };

        match response {
            Some(response) => writer.write_message(&response)?,
            None => tracing::info!(id = request.id(), "notify handled without response"),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .init();

    let (client, server) = UnixStream::pair()?;
    let server = thread::spawn(move || serve(server));

    let mut writer = MessageWriter::new(client.try_clone()?);
    let mut reader = MessageReader::new(client.try_clone()?);

    let hello = Message::request(1, "/echo", "hello").with_body_format(body_format::UTF8);
    writer.write_message(&hello)?;
    writer.send(2, "/missing", Bytes::new())?;
    writer.write_message(&Message::notify(3, "/missing", Bytes::new()))?;

    let mut stale = Message::request(4, "/echo", Bytes::new()).to_bytes().to_vec();
    stale[10] = 2;
    std::io::Write::write_all(writer.get_mut(), &stale)?;

    for _ in 0..3 {
        let response = reader.read_message()?;
        match response.error_message() {
            Some(text) => eprintln!(
                "id {} -> {}: {text}",
                response.id(),
                response.error_code()
            ),
            None => eprintln!(
                "id {} -> {:?}",
                response.id(),
                String::from_utf8_lossy(response.body())
            ),
        }
    }

    client.shutdown(std::net::Shutdown::Both)?;
    server.join().map_err(|_| "server thread panicked")??;
    Ok(())
}
