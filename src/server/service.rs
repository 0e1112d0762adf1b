use std::fmt;

use ntex_http::StatusCode;
use ntex_service::{Pipeline, Service};

use crate::{connection::Requests, consts, request::Request, response::Response};

/// Serve enqueued requests with `service`.
///
/// Each request is handled in its own task, so responses complete in any
/// order. Returns once the request queue is closed.
pub async fn serve<S>(requests: Requests, service: S)
where
    S: Service<Request> + 'static,
    S::Response: Into<Option<Response>>,
    S::Error: fmt::Debug,
{
    let pipeline = Pipeline::new(service);

    while let Some(req) = requests.recv().await {
        let pipeline = pipeline.clone();
        let _ = ntex_rt::spawn(async move { handle(&pipeline, req).await });
    }
    log::trace!("request queue is closed");
}

/// Run single request through `service` and send its response.
///
/// Service errors never reach the peer as is, they are answered with
/// `500 Internal Server Error`.
pub async fn handle<S>(pipeline: &Pipeline<S>, req: Request)
where
    S: Service<Request>,
    S::Response: Into<Option<Response>>,
    S::Error: fmt::Debug,
{
    let mut req = req;
    req.detach();
    let stream = req.stream().clone();

    let response = match pipeline.call(req).await {
        Ok(res) => res.into(),
        Err(err) => {
            log::error!("Request handler for {:?} has failed: {:?}", stream.id(), err);
            Some(
                Response::new(StatusCode::INTERNAL_SERVER_ERROR)
                    .set_header("content-type", consts::FAILURE_CONTENT_TYPE)
                    .set_body(format!("{:?}", err)),
            )
        }
    };
    stream.send_response(response).await;
}
