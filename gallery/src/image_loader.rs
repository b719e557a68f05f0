use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::mpsc::{channel, Receiver, RecvError, Sender, TryRecvError},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Result};
use image::RgbaImage;

use crate::{
    gallery_cache::GalleryCache,
    image::{load_texture_or_placeholder, ImageSource, Texture, TextureOrigin},
};

#[derive(Debug)]
pub struct LoadRequest {
    pub frame_index: usize,
    pub generation: u64,
    pub source: ImageSource,
}

#[derive(Debug)]
pub struct LoadedTexture {
    pub request_id: u32,
    pub frame_index: usize,
    pub generation: u64,
    pub texture: Texture,
}

impl LoadedTexture {
    pub fn image(&self) -> &RgbaImage {
        &self.texture.image
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.texture.origin, TextureOrigin::Placeholder { .. })
    }
}

enum MessageToWorker {
    End,
    Load { request_id: u32, request: LoadRequest },
}

enum MessageFromWorker {
    Done,
    FatalError(String),
    Loaded(LoadedTexture),
}

fn fill_queue(
    queue: &mut VecDeque<Result<MessageToWorker, RecvError>>,
    to_worker_rx: &Receiver<MessageToWorker>,
) {
    // An explicit 'End' goes to the front of the queue, so anything still
    // waiting to be loaded is dropped: nobody is going to look at it.
    if queue.len() == 0 {
        match to_worker_rx.recv() {
            Ok(MessageToWorker::End) => {
                queue.push_front(Ok(MessageToWorker::End));
                return;
            }
            Err(RecvError) => {
                queue.push_front(Err(RecvError));
                return;
            }
            Ok(message) => {
                queue.push_back(Ok(message));
            }
        }
    }
    // Drain whatever else is in the channel without blocking, to find out
    // early if the client hung up or wants us to quit.
    loop {
        match to_worker_rx.try_recv() {
            Err(TryRecvError::Empty) => {
                return;
            }
            Err(TryRecvError::Disconnected) => {
                queue.push_front(Err(RecvError));
                return;
            }
            Ok(MessageToWorker::End) => {
                queue.push_front(Ok(MessageToWorker::End));
                return;
            }
            Ok(message) => {
                queue.push_back(Ok(message));
            }
        }
    }
}

fn work_thread(
    cache_dir: PathBuf,
    to_worker_rx: Receiver<MessageToWorker>,
    from_worker_tx: Sender<MessageFromWorker>,
) -> Result<()> {
    if let Err(err) = std::fs::create_dir_all(&cache_dir) {
        // Inline data and local files don't need the cache, and downloads
        // still work without it.
        log::warn!("Unable to create {}: {err}", cache_dir.display());
    }
    let cache = GalleryCache::new(cache_dir);
    let mut queue = VecDeque::new();
    let send_message = |message: MessageFromWorker| {
        // `fill_queue()` will notice the disconnect on its next pass.
        if from_worker_tx.send(message).is_err() {
            log::debug!("Image loader unable to send response, other end hung up.");
        };
    };
    log::debug!("Image loader waiting for requests.");
    loop {
        fill_queue(&mut queue, &to_worker_rx);
        let Some(message) = queue.pop_front() else {
            break;
        };
        match message {
            Ok(MessageToWorker::End) => {
                log::debug!("Image loader received 'end' message.");
                break;
            }
            Ok(MessageToWorker::Load {
                request_id,
                request,
            }) => {
                let texture = load_texture_or_placeholder(&cache, &request.source);
                send_message(MessageFromWorker::Loaded(LoadedTexture {
                    request_id,
                    frame_index: request.frame_index,
                    generation: request.generation,
                    texture,
                }));
            }
            Err(RecvError) => {
                log::debug!("Image loader client hung up prematurely.");
                break;
            }
        }
    }

    // Ignoring result, there's not much we can do if this send fails.
    let _ = from_worker_tx.send(MessageFromWorker::Done);

    Ok(())
}

/// Loads images on a background thread so whoever is driving the render
/// loop never has to wait on the network or a decoder.
///
/// Every request gets exactly one `LoadedTexture` back, which is the
/// placeholder if the image couldn't be loaded. There are no retries.
pub struct ImageLoader {
    to_worker_tx: Sender<MessageToWorker>,
    from_worker_rx: Receiver<MessageFromWorker>,
    handler: Option<JoinHandle<()>>,
    next_request_id: u32,
    in_flight: usize,
    fatal_error: Option<String>,
}

impl ImageLoader {
    pub fn spawn(cache_dir: PathBuf) -> Self {
        let (to_worker_tx, to_worker_rx) = channel::<MessageToWorker>();
        let (from_worker_tx, from_worker_rx) = channel::<MessageFromWorker>();
        log::debug!("Spawning image loader, cache dir is {}.", cache_dir.display());
        let handler = thread::spawn(move || {
            if let Err(err) = work_thread(cache_dir, to_worker_rx, from_worker_tx.clone()) {
                log::error!("Image loader thread errored: {err:?}");
                let _ = from_worker_tx.send(MessageFromWorker::FatalError(format!("{err:?}")));
            }
        });
        ImageLoader {
            to_worker_tx,
            from_worker_rx,
            handler: Some(handler),
            next_request_id: 1,
            in_flight: 0,
            fatal_error: None,
        }
    }

    /// Queues up a load, returning an ID that the eventual result will carry.
    pub fn request(&mut self, request: LoadRequest) -> Result<u32> {
        if let Some(err) = &self.fatal_error {
            return Err(anyhow!("Image loader is dead: {err}"));
        }
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.to_worker_tx
            .send(MessageToWorker::Load {
                request_id,
                request,
            })
            .map_err(|_| anyhow!("Image loader thread is gone"))?;
        self.in_flight += 1;
        Ok(request_id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn fatal_error(&self) -> Option<&String> {
        self.fatal_error.as_ref()
    }

    fn handle_message(&mut self, message: MessageFromWorker) -> Option<LoadedTexture> {
        match message {
            MessageFromWorker::Loaded(loaded) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(loaded)
            }
            MessageFromWorker::FatalError(err) => {
                self.fatal_error = Some(err);
                self.in_flight = 0;
                None
            }
            MessageFromWorker::Done => {
                self.in_flight = 0;
                None
            }
        }
    }

    /// Everything that has finished loading since the last call. Never blocks.
    pub fn poll(&mut self) -> Vec<LoadedTexture> {
        let mut result = vec![];
        loop {
            match self.from_worker_rx.try_recv() {
                Ok(message) => {
                    if let Some(loaded) = self.handle_message(message) {
                        result.push(loaded);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.in_flight = 0;
                    break;
                }
            }
        }
        result
    }

    /// Waits for the next finished load. Returns `None` once nothing is in
    /// flight or the worker has gone away.
    pub fn recv_blocking(&mut self) -> Option<LoadedTexture> {
        while self.in_flight > 0 {
            let Ok(message) = self.from_worker_rx.recv() else {
                self.in_flight = 0;
                return None;
            };
            if let Some(loaded) = self.handle_message(message) {
                return Some(loaded);
            }
        }
        None
    }

    /// Stops the worker, abandoning anything still queued.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(handler) = self.handler.take() else {
            return;
        };
        if let Err(err) = self.to_worker_tx.send(MessageToWorker::End) {
            log::debug!("Error sending end signal to image loader: {:?}", err);
        }
        match handler.join() {
            Ok(_) => {
                log::debug!("Joined image loader thread.");
            }
            Err(err) => {
                log::warn!("Error joining image loader thread: {:?}", err);
            }
        }
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.stop();
    }
}
