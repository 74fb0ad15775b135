use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{ReadableStream, ReadableStreamDefaultReader, Response};

use super::{parse_glb, AssetProvider, LoadProgress, LoadedModel};
use crate::error::AssetError;

#[derive(Default)]
struct FetchState {
    received: u64,
    total: Option<u64>,
    active: bool,
    outcome: Option<Result<LoadedModel, AssetError>>,
}

/// Streams a model over `fetch`, counting bytes against `Content-Length`.
#[derive(Default)]
pub struct FetchProvider {
    shared: Rc<RefCell<FetchState>>,
}

impl FetchProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetProvider for FetchProvider {
    fn load(&mut self, model_id: &str) {
        tracing::info!(url = model_id, "fetching model");
        *self.shared.borrow_mut() = FetchState { active: true, ..Default::default() };

        let shared = self.shared.clone();
        let url = model_id.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = fetch_model(&url, &shared).await;
            shared.borrow_mut().outcome = Some(outcome);
        });
    }

    fn progress(&self) -> LoadProgress {
        let s = self.shared.borrow();
        if !s.active {
            LoadProgress::IDLE
        } else if s.outcome.is_some() {
            LoadProgress { percent: 100.0, active: true }
        } else {
            LoadProgress::of(s.received, s.total)
        }
    }

    fn take_resolved(&mut self) -> Option<Result<LoadedModel, AssetError>> {
        let mut s = self.shared.borrow_mut();
        let outcome = s.outcome.take();
        if outcome.is_some() {
            s.active = false;
        }
        outcome
    }
}

fn js_err(e: JsValue) -> AssetError {
    AssetError::Fetch(e.as_string().unwrap_or_else(|| format!("{e:?}")))
}

async fn fetch_model(url: &str, shared: &Rc<RefCell<FetchState>>) -> Result<LoadedModel, AssetError> {
    let window = web_sys::window().ok_or_else(|| AssetError::Fetch("no global `window`".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?
        .dyn_into()
        .map_err(js_err)?;

    if !response.ok() {
        return Err(AssetError::Http { status: response.status(), url: url.to_string() });
    }

    let total = response
        .headers()
        .get("content-length")
        .ok()
        .flatten()
        .and_then(|v| v.parse::<u64>().ok());
    shared.borrow_mut().total = total;

    let bytes = match response.body() {
        Some(body) => read_stream(body, shared).await?,
        None => {
            let buf = JsFuture::from(response.array_buffer().map_err(js_err)?)
                .await
                .map_err(js_err)?;
            Uint8Array::new(&buf).to_vec()
        }
    };
    tracing::debug!(bytes = bytes.len(), "model downloaded");

    parse_glb(&bytes)
}

async fn read_stream(body: ReadableStream, shared: &Rc<RefCell<FetchState>>) -> Result<Vec<u8>, AssetError> {
    let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();
    let mut data = Vec::new();
    loop {
        let chunk = JsFuture::from(reader.read()).await.map_err(js_err)?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_err)?
            .as_bool()
            .unwrap_or(true);
        if done {
            break;
        }
        let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(js_err)?;
        data.extend(Uint8Array::new(&value).to_vec());
        shared.borrow_mut().received = data.len() as u64;
    }
    Ok(data)
}
