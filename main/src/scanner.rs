use crate::DeviceDiscovered;
use crate::DiscoveryCoordinator;
use crate::DiscoveryError;
use crate::DiscoverySession;
use futures_channel::mpsc::UnboundedReceiver;
use futures_util::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;
use tokio_util::sync::CancellationToken;

/// Starts a session that yields every discovered device as a stream.
///
/// The stream ends once every probe has stopped. The coordinator's own
/// subscribers are still notified and may stop probes as usual.
pub fn scan(
    coordinator: &DiscoveryCoordinator,
    cancellation: CancellationToken,
) -> Result<DeviceScan, DiscoveryError> {
    let (sender, receiver) = futures_channel::mpsc::unbounded();
    let session = coordinator.start_with(
        move |event: DeviceDiscovered| {
            // Probes stop once nobody reads the stream anymore.
            let stop = sender.unbounded_send(event).is_err();
            async move { stop }
        },
        cancellation,
    )?;
    Ok(DeviceScan { session, receiver })
}

#[must_use = "dropping the session aborts its probes"]
pub struct DeviceScan {
    session: DiscoverySession,
    receiver: UnboundedReceiver<DeviceDiscovered>,
}

impl DeviceScan {
    pub fn cancel(&self) {
        self.session.cancel();
    }

    pub fn session(&mut self) -> &mut DiscoverySession {
        &mut self.session
    }

    pub fn into_session(self) -> DiscoverySession {
        self.session
    }
}

impl Stream for DeviceScan {
    type Item = DeviceDiscovered;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}
