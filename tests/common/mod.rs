//! Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tender_radar::analyze::ai_adapter::{AiError, AiProvider, AiReply};
use tender_radar::portals::browserless::{BrowserError, BrowserSession, SessionScript};
use tender_radar::portals::fetch::{FetchError, PageFetcher};

pub const VALID_REPLY: &str = r#"```json
{"MIA_Rubro":"Purificación","MIA_Score_IA":80,"MIA_Resumen_Tecnico":"Provisión de equipos de ósmosis inversa."}
```"#;

/// Replays scripted replies in order; once exhausted, repeats the last one.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<AiReply, AiError>>>,
    last: Mutex<Option<Result<AiReply, AiError>>>,
    calls: Arc<AtomicUsize>,
}

fn clone_result(r: &Result<AiReply, AiError>) -> Result<AiReply, AiError> {
    match r {
        Ok(reply) => Ok(reply.clone()),
        Err(AiError::Disabled) => Err(AiError::Disabled),
        Err(AiError::Network(m)) => Err(AiError::Network(m.clone())),
        Err(AiError::Api { status, message }) => Err(AiError::Api {
            status: *status,
            message: message.clone(),
        }),
        Err(AiError::EmptyResponse) => Err(AiError::EmptyResponse),
        Err(AiError::Decode(m)) => Err(AiError::Decode(m.clone())),
    }
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<AiReply, AiError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(reply(text))])
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

pub fn reply(text: &str) -> AiReply {
    AiReply {
        text: text.to_string(),
        tokens: None,
    }
}

impl AiProvider for ScriptedProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<AiReply, AiError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        let out = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(clone_result(&r));
                r
            }
            None => match self.last.lock().unwrap().as_ref() {
                Some(r) => clone_result(r),
                None => Err(AiError::EmptyResponse),
            },
        };
        Box::pin(async move { out })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Serves canned bodies by URL; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait::async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Connect(format!("no route to {url}")))
    }
}

/// Returns a fixed document per listing URL; unknown URLs fail.
#[derive(Default)]
pub struct CannedSession {
    pages: HashMap<String, String>,
    pub scripts: Mutex<Vec<SessionScript>>,
}

impl CannedSession {
    pub fn with(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait::async_trait]
impl BrowserSession for CannedSession {
    async fn run(&self, script: &SessionScript) -> Result<String, BrowserError> {
        self.scripts.lock().unwrap().push(script.clone());
        self.pages
            .get(&script.url)
            .cloned()
            .ok_or_else(|| BrowserError::Network(format!("timeout loading {}", script.url)))
    }
}
