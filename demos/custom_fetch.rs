//! Injecting a custom fetch primitive.
//!
//! The closure below answers every request locally, which is handy for
//! tests and for wrapping another HTTP stack.

use rek::{Api, BoxError, Options, Representation, Request, Response, StatusCode, factory};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    async_std::task::block_on(async {
        let fetch = |request: Request| async move {
            let body = json!({
                "method": request.method.as_str(),
                "url": request.url,
                "body": request.body.as_ref().and_then(|body| body.as_text()),
            });
            Ok::<_, BoxError>(
                Response::new(StatusCode::OK)
                    .with_header("content-type", "application/json")
                    .with_body(body.to_string()),
            )
        };

        let api = factory(
            Options::new()
                .base_url("https://api.example.com/v1/")
                .header("authorization", "Bearer demo-token")
                .response(Representation::Json),
            Api::with_fetch(fetch),
        );

        let echo = api
            .post("messages", json!({ "message": "hello" }), ())
            .await?
            .into_json::<serde_json::Value>()?;
        println!("{echo:#}");

        // Per-call options override the defaults.
        let text = api.get("status", "text").await?.into_text();
        println!("{text:?}");

        Ok(())
    })
}
