//! Spin HTTP handler.

use std::rc::Rc;

use anyhow::{anyhow, Result};
use futures::SinkExt;
use http::StatusCode;
use spin_sdk::http::{Fields, IncomingRequest, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;

use prerender_cache::SpinKvStore;
use prerender_core::{GatewayResponse, RequestId};
use prerender_gateway::{GatewayBuilder, GatewayError, Handled};
use prerender_observability::StructuredLogger;
use prerender_origin::{HttpTransport, SpinTransport};

use crate::{cache_store, gateway_config, ingress};

/// Main HTTP handler.
#[http_component]
async fn handle(req: IncomingRequest, response_out: ResponseOutparam) {
    let logger = StructuredLogger::new(RequestId::generate()).with_component("prerender-worker");

    let handled = match serve(req, &logger).await {
        Ok(handled) => handled,
        Err(e) => {
            logger.error(&format!("request failed: {:#}", e));
            let response = GatewayResponse::new(error_status(&e), Default::default(), Vec::new());
            if let Err(e) = send(response, response_out).await {
                logger.error(&format!("failed to send error response: {:#}", e));
            }
            return;
        }
    };

    if let Err(e) = send(handled.response, response_out).await {
        logger.error(&format!("failed to send response: {:#}", e));
    }

    handled.background.run().await;
}

async fn serve(req: IncomingRequest, logger: &StructuredLogger) -> Result<Handled> {
    let config = gateway_config()?;

    let method = ingress::from_spin_method(&req.method())?;
    let path_with_query = req.path_with_query();
    let entries = req.headers().entries();
    let body = req
        .into_body()
        .await
        .map_err(|e| anyhow!("failed to read request body: {:?}", e))?;
    let request = ingress::to_gateway_request(method, path_with_query, entries, body)?;

    let transport: Rc<dyn HttpTransport> = Rc::new(SpinTransport::new());
    let gateway = GatewayBuilder::new(config)
        .with_transport(transport)
        .with_store(cache_store(SpinKvStore::open_default(), logger))
        .build()?;

    Ok(gateway.handle(request).await?)
}

/// 502 when the origin itself could not be reached, 500 otherwise.
fn error_status(error: &anyhow::Error) -> StatusCode {
    match error.downcast_ref::<GatewayError>() {
        Some(e) if e.is_origin() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn send(response: GatewayResponse, response_out: ResponseOutparam) -> Result<()> {
    let (status, headers, body) = ingress::to_spin_parts(response);

    let fields =
        Fields::from_list(&headers).map_err(|e| anyhow!("invalid response headers: {:?}", e))?;
    let outgoing = OutgoingResponse::new(fields);
    outgoing
        .set_status_code(status)
        .map_err(|_| anyhow!("invalid status code: {}", status))?;

    let mut sink = outgoing.take_body();
    response_out.set(outgoing);

    if !body.is_empty() {
        sink.send(body)
            .await
            .map_err(|e| anyhow!("failed to write response body: {:?}", e))?;
    }
    sink.close()
        .await
        .map_err(|e| anyhow!("failed to close response body: {:?}", e))?;

    Ok(())
}
