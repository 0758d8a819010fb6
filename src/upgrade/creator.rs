//! Application hook that turns a negotiated request into an endpoint.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::completion::Completion;
use super::request::{UpgradeRequest, UpgradeResponse};
use crate::session::Endpoint;
use crate::BoxError;

/// `Ok(Some(_))` establishes a session, `Ok(None)` declines the upgrade.
pub type CreateResult = Result<Option<Arc<dyn Endpoint>>, BoxError>;

/// Builds the endpoint for one upgrade request.
///
/// The creator may adjust the response (subprotocol, config, error status)
/// and may complete the exchange itself. If it does not, the container
/// completes it once the returned future resolves. A panic, whether in
/// `create` itself or in the returned future, fails the exchange.
pub trait WebSocketCreator: Send + Sync + 'static {
    fn create<'a>(
        &'a self,
        request: &'a UpgradeRequest,
        response: &'a mut UpgradeResponse,
        completion: &'a Completion,
    ) -> BoxFuture<'a, CreateResult>;
}

/// Synchronous closures are creators.
impl<F> WebSocketCreator for F
where
    F: Fn(&UpgradeRequest, &mut UpgradeResponse, &Completion) -> CreateResult
        + Send
        + Sync
        + 'static,
{
    fn create<'a>(
        &'a self,
        request: &'a UpgradeRequest,
        response: &'a mut UpgradeResponse,
        completion: &'a Completion,
    ) -> BoxFuture<'a, CreateResult> {
        Box::pin(async move { self(request, response, completion) })
    }
}

/// Pins down closure signatures so the compiler infers higher-ranked
/// lifetimes for the arguments.
pub fn creator_fn<F>(f: F) -> F
where
    F: Fn(&UpgradeRequest, &mut UpgradeResponse, &Completion) -> CreateResult
        + Send
        + Sync
        + 'static,
{
    f
}
