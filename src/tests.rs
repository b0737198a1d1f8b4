mod response_tests;

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use futures_util::stream;

use crate::{Api, BoxError, Request, Response, StatusCode};

/// In-memory fetch primitive that records every request it receives.
#[derive(Clone, Default)]
struct Recorder {
    requests: Arc<Mutex<Vec<Request>>>,
}

impl Recorder {
    fn api<F>(&self, respond: F) -> Api
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let requests = Arc::clone(&self.requests);
        Api::with_fetch(move |request: Request| {
            let response = respond(&request);
            requests.lock().unwrap().push(request);
            async move { Ok::<_, BoxError>(response) }
        })
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> Request {
        self.requests().pop().expect("no request was issued")
    }

    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

fn ok_json(body: &'static str) -> Response {
    Response::new(StatusCode::OK)
        .with_header("content-type", "application/json")
        .with_body(body)
}

/// A response whose body flags `read` once somebody polls it.
fn tracked(status: StatusCode, body: &'static str, read: &Arc<AtomicBool>) -> Response {
    let read = Arc::clone(read);
    Response::new(status).with_stream(stream::once(async move {
        read.store(true, Ordering::SeqCst);
        Ok::<_, BoxError>(Bytes::from_static(body.as_bytes()))
    }))
}

/// A response whose body fails to read.
fn broken(status: StatusCode) -> Response {
    Response::new(status).with_stream(stream::once(async {
        Err::<Bytes, BoxError>("connection reset".into())
    }))
}
