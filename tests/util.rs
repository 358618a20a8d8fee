// not every test binary uses every helper
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use runboard::proto::{event, summary_value, Event};

/// The scalar `(tag, value, step)` triples in a run's events, in file order.
pub fn scalar_records(events: &[Event]) -> Vec<(String, f32, i64)> {
    let mut records = Vec::new();
    for event in events {
        if let Some(event::What::Summary(summary)) = &event.what {
            for value in &summary.value {
                if let Some(summary_value::Content::SimpleValue(scalar)) = &value.content {
                    records.push((value.tag.clone(), *scalar, event.step));
                }
            }
        }
    }
    records
}

/// What the stand-in plotting server saw in one request.
pub struct CapturedRequest {
    pub path: String,
    pub body: String,
}

/// Minimal loopback HTTP server: answers every POST with `status` and hands
/// what it saw down the channel. Lives until the test process exits.
pub fn serve(status: u16) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let address = listener.local_addr().expect("listener has an address");
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || loop {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        if handle_request(stream, status, &sender).is_none() {
            return;
        }
    });
    (format!("http://{}", address), receiver)
}

fn handle_request(
    mut stream: TcpStream,
    status: u16,
    sender: &mpsc::Sender<CapturedRequest>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let path = request_line.split_whitespace().nth(1)?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let header = line.trim_end().to_ascii_lowercase();
        if header.is_empty() {
            break;
        }
        if let Some(rest) = header.strip_prefix("content-length:") {
            content_length = rest.trim().parse().ok()?;
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    // `connection: close` so the client reconnects per request and the
    // accept loop sees every send
    let response = format!(
        "HTTP/1.1 {} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        status
    );
    stream.write_all(response.as_bytes()).ok()?;
    sender
        .send(CapturedRequest {
            path,
            body: String::from_utf8(body).ok()?,
        })
        .ok()
}
