// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! TCP ingest listeners.
//!
//! Two line disciplines are accepted: TNC2 monitor lines (one frame per
//! line, as printed by most TNC software) and a raw KISS byte stream (as
//! exposed by software TNCs on their KISS port).

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use sonde_ax25::KissDeframer;
use sonde_store::StoreError;

use crate::ingest::{kiss_to_tnc2, tnc2_line_to_raw_frame, Ingest};

/// Longest accepted TNC2 line; longer lines are discarded up to their newline.
const MAX_LINE_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    Tnc2,
    Kiss,
}

impl Discipline {
    fn as_str(&self) -> &'static str {
        match self {
            Discipline::Tnc2 => "TNC2",
            Discipline::Kiss => "KISS",
        }
    }
}

/// Bind `addr` and accept clients speaking `discipline`.
pub async fn run_listener(
    addr: SocketAddr,
    discipline: Discipline,
    ingest: Arc<Ingest>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("{} listener on {}", discipline.as_str(), addr);
    serve(listener, discipline, ingest).await
}

async fn serve(
    listener: TcpListener,
    discipline: Discipline,
    ingest: Arc<Ingest>,
) -> std::io::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("{} client connected: {}", discipline.as_str(), peer);

        let ingest = Arc::clone(&ingest);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, peer, discipline, ingest).await {
                error!("Client {} error: {:?}", peer, e);
            }
        });
    }
}

async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    discipline: Discipline,
    ingest: Arc<Ingest>,
) -> std::io::Result<()> {
    let label = addr.to_string();
    match discipline {
        Discipline::Tnc2 => read_tnc2_lines(socket, &label, &ingest).await?,
        Discipline::Kiss => read_kiss_stream(socket, &label, &ingest).await?,
    }
    info!("Client {} disconnected", addr);
    Ok(())
}

async fn read_tnc2_lines<R>(reader: R, label: &str, ingest: &Arc<Ingest>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    let mut discarding = false;
    loop {
        buf.clear();
        let n = (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(());
        }
        let complete = buf.last() == Some(&b'\n');
        if discarding {
            discarding = !complete;
            continue;
        }
        if !complete && n == MAX_LINE_LEN {
            warn!("Discarding TNC2 line over {} bytes from {}", MAX_LINE_LEN, label);
            discarding = true;
            continue;
        }

        // Non-UTF-8 bytes become U+FFFD instead of ending the session.
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        // `#` lines are server banners and keepalives.
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match tnc2_line_to_raw_frame(trimmed, Utc::now()) {
            Some(frame) => {
                let ingest = Arc::clone(ingest);
                accept_blocking(move || ingest.accept(frame)).await;
            }
            None => warn!("Unparseable TNC2 line from {}: {:?}", label, trimmed),
        }
    }
}

/// Feed a KISS byte stream (TCP or serial) into `ingest` until EOF.
pub async fn read_kiss_stream<R>(
    mut reader: R,
    label: &str,
    ingest: &Arc<Ingest>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut deframer = KissDeframer::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        for kiss in deframer.push(&buf[..n]) {
            match kiss_to_tnc2(&kiss) {
                Some(tnc2) => {
                    let ingest = Arc::clone(ingest);
                    accept_blocking(move || ingest.accept_rf(tnc2, Utc::now())).await;
                }
                None => debug!("Dropped KISS frame from {}", label),
            }
        }
    }
}

/// Run a store write on the blocking pool; the store dumps to disk on
/// every append.
async fn accept_blocking<F, T>(accept: F)
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(accept).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("Failed to store frame: {}", e),
        Err(e) => error!("Frame store task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sonde_ax25::{encode_kiss, encode_ui_frame};
    use sonde_frames::BatchDecoder;
    use sonde_store::{FrameFilter, FrameOrder, FrameStore, MemoryFrameStore};
    use tokio::io::AsyncWriteExt;

    async fn start(discipline: Discipline) -> (SocketAddr, Arc<MemoryFrameStore>) {
        let store = Arc::new(MemoryFrameStore::new());
        let ingest = Arc::new(Ingest::new(store.clone(), BatchDecoder::new(), None));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, discipline, ingest));
        (addr, store)
    }

    async fn wait_for_frames(store: &MemoryFrameStore, count: usize) {
        for _ in 0..100 {
            if store.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} frames, have {}", store.len());
    }

    #[tokio::test]
    async fn test_tnc2_listener_stores_frames() {
        let (addr, store) = start(Discipline::Tnc2).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"# aprsc 2.1\r\nF4KMN-11>APLT:t078h31b10148\r\nnonsense\r\nF4KMN-11>APLT,WIDE1-1:!4759.73N/00012.26E\r\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        wait_for_frames(&store, 2).await;
        let frames = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].message, "t078h31b10148");
        assert_eq!(frames[1].destination, "APLT");
    }

    #[tokio::test]
    async fn test_tnc2_listener_survives_non_utf8_line() {
        let (addr, store) = start(Discipline::Tnc2).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"F4KMN>APLT:t078h31b10148\r\nF4KMN>APLT:ballon \xe9t\xe9\r\nF4KMN>APLT:!4759.73N/00012.26E\r\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        wait_for_frames(&store, 3).await;
        let frames = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].message, "ballon \u{FFFD}t\u{FFFD}");
        assert_eq!(frames[2].message, "!4759.73N/00012.26E");
    }

    #[tokio::test]
    async fn test_tnc2_listener_discards_overlong_line() {
        let (addr, store) = start(Discipline::Tnc2).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut payload = b"F4KMN>APLT:".to_vec();
        payload.extend(std::iter::repeat(b'x').take(3 * MAX_LINE_LEN));
        payload.extend_from_slice(b"\r\nF4KMN>APLT:t078h31b10148\r\n");
        client.write_all(&payload).await.unwrap();
        client.shutdown().await.unwrap();

        wait_for_frames(&store, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        let frames = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message, "t078h31b10148");
    }

    #[tokio::test]
    async fn test_kiss_listener_handles_split_writes() {
        let (addr, store) = start(Discipline::Kiss).await;
        let ax25 = encode_ui_frame("F4KMN-11", "APLT", &[], b"t077h36b9993 -1.06,-0.05,0.07")
            .unwrap();
        let bytes = encode_kiss(0, &ax25);

        let mut client = TcpStream::connect(addr).await.unwrap();
        let (head, tail) = bytes.split_at(9);
        client.write_all(head).await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(tail).await.unwrap();
        client.shutdown().await.unwrap();

        wait_for_frames(&store, 1).await;
        let frames = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(frames[0].source, "F4KMN-11");
        assert_eq!(frames[0].message, "t077h36b9993 -1.06,-0.05,0.07");
    }
}
