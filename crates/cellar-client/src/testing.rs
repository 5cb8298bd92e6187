//! In-process transport for driving the state machines in tests.

use std::{
  collections::{HashMap, VecDeque},
  future::Future,
  sync::Mutex,
};

use cellar_core::transport::{ApiRequest, HttpError, Transport};
use serde_json::Value;
use tokio::sync::oneshot;

type Reply = Result<Value, HttpError>;

enum Scripted {
  Now(Reply),
  Gated(oneshot::Receiver<Reply>),
}

/// Answers each path from a queue of scripted replies and logs every request.
/// Unscripted paths answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
  routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
  log:    Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
  pub fn reply(&self, path: &str, reply: Reply) {
    self.push(path, Scripted::Now(reply));
  }

  /// Script a reply that settles only when the returned sender fires.
  pub fn gate(&self, path: &str) -> oneshot::Sender<Reply> {
    let (tx, rx) = oneshot::channel();
    self.push(path, Scripted::Gated(rx));
    tx
  }

  pub fn requests(&self) -> Vec<ApiRequest> { self.log.lock().unwrap().clone() }

  fn push(&self, path: &str, scripted: Scripted) {
    self
      .routes
      .lock()
      .unwrap()
      .entry(path.to_string())
      .or_default()
      .push_back(scripted);
  }
}

impl Transport for ScriptedTransport {
  fn request(&self, request: ApiRequest) -> impl Future<Output = Reply> + Send + '_ {
    let next = self
      .routes
      .lock()
      .unwrap()
      .get_mut(&request.path)
      .and_then(VecDeque::pop_front);
    self.log.lock().unwrap().push(request);
    async move {
      match next {
        Some(Scripted::Now(reply)) => reply,
        Some(Scripted::Gated(rx)) => rx
          .await
          .unwrap_or_else(|_| Err(HttpError::network("gate dropped"))),
        None => Err(HttpError::status(404, "not scripted")),
      }
    }
  }
}
