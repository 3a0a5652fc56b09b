use crate::DeviceDiscovered;
use futures_util::future::BoxFuture;
use futures_util::Future;
use futures_util::FutureExt;
use std::sync::Arc;

/// Receives discovered devices and decides whether the reporting probe stops.
///
/// Returning `true` asks the probe to stop. The verdicts of all listeners
/// notified for one device are OR-ed together.
pub trait DiscoveryListener: Send + Sync {
    fn on_discovered(&self, event: DeviceDiscovered) -> BoxFuture<'static, bool>;
}

impl<F, Fut> DiscoveryListener for F
where
    F: Fn(DeviceDiscovered) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    fn on_discovered(&self, event: DeviceDiscovered) -> BoxFuture<'static, bool> {
        self(event).boxed()
    }
}

/// Adapts a synchronous callback into a [DiscoveryListener].
pub(crate) struct SyncListener<F>(pub F);

impl<F> DiscoveryListener for SyncListener<F>
where
    F: Fn(&DeviceDiscovered) -> bool + Send + Sync,
{
    fn on_discovered(&self, event: DeviceDiscovered) -> BoxFuture<'static, bool> {
        futures_util::future::ready((self.0)(&event)).boxed()
    }
}

pub(crate) type Listeners = Arc<[Arc<dyn DiscoveryListener>]>;

/// Notifies every listener in order and returns the combined stop verdict.
pub(crate) async fn notify(
    listeners: &[Arc<dyn DiscoveryListener>],
    mut event: DeviceDiscovered,
) -> bool {
    for listener in listeners {
        let stop = listener.on_discovered(event.clone()).await;
        event.stop_requested |= stop;
    }
    event.stop_requested
}
