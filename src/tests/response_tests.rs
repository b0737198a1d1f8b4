use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use serde::Deserialize;
use serde_json::{Value, json};

use super::{Recorder, broken, ok_json, tracked};
use crate::{
    Api, BoxError, Error, ErrorKind, FormData, Options, Reply, Representation, Request,
    Response, StatusCode, factory,
};

fn single(response: fn() -> Response) -> crate::Rek {
    factory(Options::new(), Recorder::default().api(move |_| response()))
}

#[async_std::test]
async fn json_representation_parses_the_body() {
    let rek = single(|| ok_json(r#"{"id":7,"tags":["a"]}"#));

    let reply = rek.request("/x", "json").await.unwrap();

    assert_eq!(
        reply.into_json::<Value>().unwrap(),
        json!({ "id": 7, "tags": ["a"] })
    );
}

#[async_std::test]
async fn typed_json_replies() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Todo {
        id: u32,
        done: bool,
    }

    let rek = single(|| ok_json(r#"{"id":1,"done":true}"#));

    let todo: Todo = rek
        .get("/todos/1", Representation::Json)
        .await
        .unwrap()
        .into_json()
        .unwrap();

    assert_eq!(todo, Todo { id: 1, done: true });
}

#[async_std::test]
async fn invalid_json_is_a_body_error() {
    let rek = single(|| Response::new(StatusCode::OK).with_body("<html>"));

    let err = rek.request("/x", "json").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BodyParse);
}

#[async_std::test]
async fn no_content_resolves_to_null_without_reading() {
    let read = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&read);
    let recorder = Recorder::default();
    let rek = factory(
        Options::new(),
        recorder.api(move |_| tracked(StatusCode::NO_CONTENT, "", &flag)),
    );

    let reply = rek.request("/x", "json").await.unwrap();

    assert!(reply.is_null());
    assert!(!read.load(Ordering::SeqCst));
}

#[async_std::test]
async fn text_representation() {
    let rek = single(|| Response::new(StatusCode::OK).with_body("hello"));

    let reply = rek.request("/x", "text").await.unwrap();

    assert_eq!(reply.into_text().as_deref(), Some("hello"));
}

#[async_std::test]
async fn binary_representations() {
    let rek = single(|| {
        Response::new(StatusCode::OK)
            .with_header("content-type", "image/png")
            .with_body(&b"\x89PNG"[..])
    });

    let bytes = rek.request("/x", "arrayBuffer").await.unwrap();
    let blob = rek.request("/x", "blob").await.unwrap();

    assert_eq!(bytes.into_bytes().unwrap().as_ref(), b"\x89PNG");
    match blob {
        Reply::Blob(blob) => {
            assert_eq!(blob.content_type(), Some("image/png"));
            assert_eq!(blob.len(), 4);
        }
        other => panic!("expected a blob, got {other:?}"),
    }
}

#[async_std::test]
async fn form_data_representation() {
    let recorder = Recorder::default();
    let rek = factory(
        Options::new(),
        recorder.api(|_| {
            let (_, body) = FormData::new()
                .boundary("xyz")
                .with_text("name", "rek")
                .encode();
            Response::new(StatusCode::OK)
                .with_header("content-type", "multipart/form-data; boundary=xyz")
                .with_body(body)
        }),
    );

    let form = rek
        .request("/form", "formData")
        .await
        .unwrap()
        .into_form_data()
        .unwrap();

    assert_eq!(recorder.last().headers["accept"], "multipart/form-data");
    assert_eq!(form.get("name").and_then(|part| part.as_text()), Some("rek"));
}

#[async_std::test]
async fn accept_header_matches_the_representation() {
    let recorder = Recorder::default();
    let rek = factory(
        Options::new().header("accept", "application/xml"),
        recorder.api(|_| Response::new(StatusCode::OK).with_body("x")),
    );

    rek.request("/x", "text").await.unwrap();
    rek.request("/x", "arrayBuffer").await.unwrap();
    rek.request("/x", ()).await.unwrap();

    let accepts: Vec<_> = recorder
        .requests()
        .into_iter()
        .map(|request| request.headers["accept"].to_str().unwrap().to_owned())
        .collect();
    assert_eq!(accepts, ["text/*", "*/*", "application/xml"]);
}

#[async_std::test]
async fn custom_transform_receives_the_response() {
    let rek = single(|| ok_json(r#"{"items":[1,2,3]}"#));

    let reply = rek
        .request(
            "/x",
            Options::new().transform(|mut response: Response| async move {
                let value = response.json().await?;
                Ok::<_, Error>(Reply::Json(value["items"].clone()))
            }),
        )
        .await
        .unwrap();

    assert_eq!(reply.into_json::<Vec<u8>>().unwrap(), [1, 2, 3]);
}

#[async_std::test]
async fn transform_can_resolve_to_any_value() {
    #[derive(Debug, PartialEq)]
    struct Summary {
        status: StatusCode,
        content_type: Option<String>,
    }

    let rek = single(|| ok_json("{}"));

    let reply = rek
        .request(
            "/x",
            Options::new().transform(|response: Response| async move {
                Ok::<_, Error>(Reply::custom(Summary {
                    status: response.status(),
                    content_type: response.content_type().map(ToOwned::to_owned),
                }))
            }),
        )
        .await
        .unwrap();

    let reply = match reply.into_custom::<String>() {
        Ok(_) => panic!("the custom value is not a String"),
        Err(reply) => reply,
    };
    assert_eq!(
        reply.into_custom::<Summary>().unwrap(),
        Summary {
            status: StatusCode::OK,
            content_type: Some("application/json".to_owned()),
        }
    );
}

#[async_std::test]
async fn empty_response_type_returns_the_raw_response() {
    let rek = single(|| ok_json(r#"{"id":1}"#));

    let reply = rek.request("/x", "").await.unwrap();

    let mut response = reply.into_response().unwrap();
    assert!(!response.body_used());
    assert_eq!(response.text().await.unwrap(), r#"{"id":1}"#);
}

#[async_std::test]
async fn text_replaces_invalid_utf8() {
    let rek = single(|| Response::new(StatusCode::OK).with_body(&b"caf\xe9 open"[..]));

    let reply = rek.request("/x", "text").await.unwrap();

    assert_eq!(reply.into_text().as_deref(), Some("caf\u{fffd} open"));
}

#[async_std::test]
async fn fetch_error_keeps_text_that_is_not_utf8() {
    let rek = single(|| Response::new(StatusCode::BAD_REQUEST).with_body(&b"caf\xe9 closed"[..]));

    let err = rek.request("/x", "json").await.unwrap_err();

    assert_eq!(
        err.fetch_error().unwrap().body(),
        &Value::String("caf\u{fffd} closed".into())
    );
}

#[async_std::test]
async fn transform_is_not_called_for_failures() {
    let rek = single(|| Response::new(StatusCode::BAD_REQUEST));

    let err = rek
        .request(
            "/x",
            Options::new().transform(|_| async {
                Err::<Reply, Error>(Error::other("transform must not run"))
            }),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
}

#[async_std::test]
async fn fetch_error_parses_json_bodies() {
    let rek = single(|| {
        Response::new(StatusCode::UNPROCESSABLE_ENTITY)
            .with_url("https://api.example.com/x")
            .with_body(r#"{"reason":"bad"}"#)
    });

    let err = rek.request("/x", "json").await.unwrap_err();

    assert!(err.is_client_error());
    let fetch = err.fetch_error().unwrap();
    assert_eq!(fetch.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(fetch.message(), "Unprocessable Entity");
    assert_eq!(fetch.body(), &json!({ "reason": "bad" }));
    assert_eq!(fetch.response().url(), "https://api.example.com/x");
    assert!(fetch.response().body_used());

    #[derive(Deserialize)]
    struct Reason {
        reason: String,
    }
    assert_eq!(fetch.deserialize_body::<Reason>().unwrap().reason, "bad");
}

#[async_std::test]
async fn fetch_error_keeps_raw_text() {
    let rek = single(|| {
        Response::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_status_text("Kaputt")
            .with_body("oops")
    });

    let err = rek.request("/x", ()).await.unwrap_err();

    assert!(err.is_server_error());
    assert_eq!(err.to_string(), "Kaputt");
    assert_eq!(err.fetch_error().unwrap().body(), &Value::String("oops".into()));
}

#[async_std::test]
async fn fetch_error_body_is_null_when_empty_or_unreadable() {
    let empty = single(|| Response::new(StatusCode::NOT_FOUND));
    let unreadable = single(|| broken(StatusCode::BAD_GATEWAY));

    let err = empty.request("/x", ()).await.unwrap_err();
    assert_eq!(err.fetch_error().unwrap().body(), &Value::Null);

    let err = unreadable.request("/x", ()).await.unwrap_err();
    let fetch = err.fetch_error().unwrap();
    assert_eq!(fetch.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(fetch.body(), &Value::Null);
}

#[async_std::test]
async fn transport_errors_are_propagated_unchanged() {
    #[derive(Debug, thiserror::Error)]
    #[error("network unreachable")]
    struct Unreachable;

    let rek = factory(
        Options::new(),
        Api::with_fetch(|_: Request| async { Err::<Response, BoxError>(Box::new(Unreachable)) }),
    );

    let err = rek.request("https://example.com/", "json").await.unwrap_err();

    assert!(err.is_network_error());
    match err {
        Error::Transport(source) => assert!(source.downcast_ref::<Unreachable>().is_some()),
        other => panic!("expected transport error, got {other:?}"),
    }
}
