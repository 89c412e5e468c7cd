//! Response capture decorator.
//!
//! [`CaptureBody`] wraps the body handed to the transport. Each frame is
//! passed through untouched; data frames are also recorded in the request's
//! [`CaptureSession`]. Reaching the end of the stream commits the session,
//! an error frame discards it, and dropping the body early (client gone)
//! discards it through the session's own drop.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use super::session::{CaptureSession, DiscardReason};

pin_project! {
    pub struct CaptureBody<B> {
        #[pin]
        inner: B,
        session: CaptureSession,
    }
}

impl<B> CaptureBody<B> {
    pub fn new(inner: B, session: CaptureSession) -> Self {
        Self { inner, session }
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> &CaptureSession {
        &self.session
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        match ready!(this.inner.as_mut().poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.session.record(data);
                }
                // Transports may stop polling once the body reports its end.
                if this.inner.is_end_stream() {
                    this.session.commit();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(err)) => {
                this.session.discard(DiscardReason::TransferError);
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.session.commit();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
