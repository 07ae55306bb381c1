//! Background worker pool for texture decode (spec §5): no GPU calls cross
//! the worker boundary, responses are matched back to requests by id, and a
//! response for an already-freed source is silently dropped.

use crate::error::TextureLoadErrorKind;
use crate::id::TextureId;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub texture_id: TextureId,
    pub bytes: Arc<[u8]>,
    pub premultiply: bool,
    pub crop: Option<(u32, u32, u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct DecodedBitmap {
    pub texture_id: TextureId,
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

#[derive(Debug, Clone)]
pub struct DecodeFailure {
    pub texture_id: TextureId,
    pub kind: TextureLoadErrorKind,
}

pub type DecodeResult = Result<DecodedBitmap, DecodeFailure>;

/// What a worker pool must provide. `ThreadPoolDecoder` is the bundled
/// implementation; hosts embedding the core on a platform without
/// `std::thread` (none currently) could swap in another impl.
pub trait Decoder: Send + Sync {
    fn submit(&self, request: DecodeRequest);
    /// Drains any responses that have arrived since the last poll. Called
    /// once per frame from the main task (spec §5: "the main task performs
    /// the GL upload").
    fn poll(&self) -> Vec<DecodeResult>;
}

fn decode_bytes(bytes: &[u8], premultiply: bool) -> Result<(u32, u32, Vec<u8>), TextureLoadErrorKind> {
    let img = image::load_from_memory(bytes).map_err(|_| TextureLoadErrorKind::Decode)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    if premultiply {
        for px in pixels.chunks_exact_mut(4) {
            let a = px[3] as u32;
            px[0] = ((px[0] as u32 * a) / 255) as u8;
            px[1] = ((px[1] as u32 * a) / 255) as u8;
            px[2] = ((px[2] as u32 * a) / 255) as u8;
        }
    }
    Ok((width, height, pixels))
}

/// A fixed-size pool of OS threads pulling requests off a shared queue and
/// pushing results onto a results channel drained by `poll`.
pub struct ThreadPoolDecoder {
    request_tx: Sender<DecodeRequest>,
    result_rx: Mutex<Receiver<DecodeResult>>,
    _workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPoolDecoder {
    pub fn new(num_workers: u32) -> Self {
        let (request_tx, request_rx) = channel::<DecodeRequest>();
        let (result_tx, result_rx) = channel::<DecodeResult>();
        let request_rx = Arc::new(Mutex::new(request_rx));

        let workers = (0..num_workers.max(1))
            .map(|_| {
                let request_rx = request_rx.clone();
                let result_tx = result_tx.clone();
                thread::spawn(move || loop {
                    let request = {
                        let rx = request_rx.lock().unwrap();
                        rx.recv()
                    };
                    let Ok(request) = request else {
                        break;
                    };
                    let result = match decode_bytes(&request.bytes, request.premultiply) {
                        Ok((width, height, rgba)) => Ok(DecodedBitmap {
                            texture_id: request.texture_id,
                            width,
                            height,
                            rgba: rgba.into(),
                        }),
                        Err(kind) => Err(DecodeFailure {
                            texture_id: request.texture_id,
                            kind,
                        }),
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                })
            })
            .collect();

        Self {
            request_tx,
            result_rx: Mutex::new(result_rx),
            _workers: workers,
        }
    }
}

impl Decoder for ThreadPoolDecoder {
    fn submit(&self, request: DecodeRequest) {
        // A send failure means every worker thread has panicked and
        // exited; there's no request-level recovery at this layer, so the
        // request is simply dropped (the source stays in `loading` and the
        // caller's own watchdog, if any, would need to detect the stall).
        let _ = self.request_tx.send(request);
    }

    fn poll(&self) -> Vec<DecodeResult> {
        let rx = self.result_rx.lock().unwrap();
        let mut out = Vec::new();
        while let Ok(result) = rx.try_recv() {
            out.push(result);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_invalid_bytes_reports_decode_failure() {
        let pool = ThreadPoolDecoder::new(1);
        pool.submit(DecodeRequest {
            texture_id: TextureId(0),
            bytes: Arc::from(vec![0u8; 4]),
            premultiply: false,
            crop: None,
        });
        let mut results = Vec::new();
        for _ in 0..200 {
            results.extend(pool.poll());
            if !results.is_empty() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(DecodeFailure { .. })));
    }
}
