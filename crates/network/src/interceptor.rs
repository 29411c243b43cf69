// crates/network/src/interceptor.rs
//! Hooks around a single request/response exchange

use crate::error::NetworkResult;
use crate::transport::{HttpTransport, ObjectRequest, ObjectResponse, RequestContext};

/// Observes and adjusts one HTTP exchange
///
/// `before_send` runs on the request the transport is about to execute and
/// may rewrite its headers. `after_receive` runs on the response before its
/// body is handed to anyone. An error from either hook aborts the exchange.
pub trait ExchangeInterceptor {
    fn before_send(&mut self, request: &mut ObjectRequest) -> NetworkResult<()>;

    fn after_receive(&mut self, response: &ObjectResponse) -> NetworkResult<()>;
}

/// Pass-through interceptor
impl ExchangeInterceptor for () {
    fn before_send(&mut self, _request: &mut ObjectRequest) -> NetworkResult<()> {
        Ok(())
    }

    fn after_receive(&mut self, _response: &ObjectResponse) -> NetworkResult<()> {
        Ok(())
    }
}

/// Executes `request` on `transport` with `interceptor` wrapped around it
pub async fn execute_intercepted<T, I>(
    transport: &T,
    mut request: ObjectRequest,
    context: RequestContext,
    interceptor: &mut I,
) -> NetworkResult<ObjectResponse>
where
    T: HttpTransport,
    I: ExchangeInterceptor + Send,
{
    interceptor.before_send(&mut request)?;

    log::debug!(
        "{} {} (retries disabled: {})",
        request.method(),
        request.url(),
        context.retries_disabled()
    );

    let response = transport.execute(request, context).await?;
    interceptor.after_receive(&response)?;
    Ok(response)
}
