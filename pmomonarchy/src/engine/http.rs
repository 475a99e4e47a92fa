//! Headless engine that keeps the HTTP stream open without decoding it.
//!
//! Useful to monitor a stream from a server, or as the transport half of a
//! real player: the session lifecycle (connect, first byte, end of stream,
//! failure) is exactly the one a decoding engine would report.

use super::{AudioBackend, AudioEngine, EngineEvent, EngineEventSink, EngineOptions, SessionId};
use crate::error::{Error, Result};
use futures::StreamExt;
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpStreamBackend {
    client: Client,
}

impl HttpStreamBackend {
    pub fn new() -> Result<Self> {
        // no overall timeout: a live stream stays open for hours
        let client = Client::builder()
            .user_agent(crate::constants::DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl AudioBackend for HttpStreamBackend {
    fn create(
        &self,
        session: SessionId,
        options: EngineOptions,
        events: EngineEventSink,
    ) -> Result<Box<dyn AudioEngine>> {
        let url = options
            .sources
            .first()
            .cloned()
            .ok_or_else(|| Error::Engine("no source given".into()))?;

        Ok(Box::new(HttpStreamEngine {
            session,
            url,
            client: self.client.clone(),
            events,
            volume: options.volume,
            reader: None,
            unloaded: false,
        }))
    }
}

struct Reader {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct HttpStreamEngine {
    session: SessionId,
    url: String,
    client: Client,
    events: EngineEventSink,
    volume: f32,
    reader: Option<Reader>,
    unloaded: bool,
}

impl HttpStreamEngine {
    fn stop_reader(&mut self) -> bool {
        match self.reader.take() {
            Some(reader) => {
                reader.cancel.cancel();
                let finished = reader.task.is_finished();
                reader.task.abort();
                !finished
            }
            None => false,
        }
    }
}

impl AudioEngine for HttpStreamEngine {
    fn play(&mut self) {
        if self.unloaded {
            self.events
                .emit(EngineEvent::PlayError("engine already unloaded".into()));
            return;
        }
        if let Some(reader) = &self.reader {
            if !reader.task.is_finished() {
                return;
            }
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_stream(
            self.session,
            self.client.clone(),
            self.url.clone(),
            self.events.clone(),
            cancel.clone(),
        ));
        self.reader = Some(Reader { cancel, task });
    }

    fn pause(&mut self) {
        if self.stop_reader() {
            self.events.emit(EngineEvent::Paused);
        }
    }

    fn unload(&mut self) {
        self.stop_reader();
        self.unloaded = true;
    }

    fn set_volume(&mut self, volume: f32) {
        // nothing is rendered; kept for diagnostics
        self.volume = volume;
        debug!(session = %self.session, volume, "Volume changed");
    }
}

impl Drop for HttpStreamEngine {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

async fn read_stream(
    session: SessionId,
    client: Client,
    url: String,
    events: EngineEventSink,
    cancel: CancellationToken,
) {
    let response = tokio::select! {
        _ = cancel.cancelled() => return,
        response = client.get(&url).send() => response,
    };

    let response = match response {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            warn!(%session, %url, status = %response.status(), "Stream refused");
            events.emit(EngineEvent::LoadError(format!(
                "status {}",
                response.status().as_u16()
            )));
            return;
        }
        Err(err) => {
            warn!(%session, %url, "Stream unreachable: {err}");
            events.emit(EngineEvent::LoadError(err.to_string()));
            return;
        }
    };

    let mut body = response.bytes_stream();
    let mut received: u64 = 0;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(%session, received, "Stream reader cancelled");
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                if received == 0 && !bytes.is_empty() {
                    events.emit(EngineEvent::Started);
                }
                received += bytes.len() as u64;
            }
            Some(Err(err)) => {
                warn!(%session, received, "Stream interrupted: {err}");
                let event = if received == 0 {
                    EngineEvent::LoadError(err.to_string())
                } else {
                    EngineEvent::Ended
                };
                events.emit(event);
                return;
            }
            None => {
                debug!(%session, received, "Stream reached end");
                let event = if received == 0 {
                    EngineEvent::PlayError("empty stream".into())
                } else {
                    EngineEvent::Ended
                };
                events.emit(event);
                return;
            }
        }
    }
}
