// First-value adaptation of multi-valued producers.

use std::pin::pin;

use futures_util::{Stream, StreamExt};

use crate::error::NoOutput;

/// Resolve with the first item of `stream`, then drop the stream.
///
/// A first item that is an `Err` is propagated; a stream that ends without
/// emitting yields [`NoOutput`] converted into the caller's error type.
/// Dropping the returned future drops the stream with it.
pub async fn first_value<S, T, E>(stream: S) -> Result<T, E>
where
    S: Stream<Item = Result<T, E>>,
    E: From<NoOutput>,
{
    let mut stream = pin!(stream);
    match stream.next().await {
        Some(item) => item,
        None => Err(NoOutput.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures_util::stream;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn takes_the_first_value_only() {
        let values = stream::iter(vec![Ok::<_, Error>(1), Ok(2), Ok(3)]);
        assert_eq!(first_value(values).await.ok(), Some(1));
    }

    #[tokio::test]
    async fn empty_stream_is_no_output() {
        let empty = stream::empty::<Result<u8, Error>>();
        assert!(matches!(first_value(empty).await, Err(Error::NoOutput)));
    }

    #[tokio::test]
    async fn leading_error_propagates() {
        let values = stream::iter(vec![Err(Error::Unauthorized), Ok(1)]);
        assert!(matches!(first_value(values).await, Err(Error::Unauthorized)));
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn stream_is_dropped_after_first_value() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        let values = stream::iter(vec![Ok::<_, Error>(7)]).chain(stream::once(async move {
            let _keep = &flag;
            Ok(8)
        }));

        assert_eq!(first_value(values).await.ok(), Some(7));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stream_is_dropped_with_the_future() {
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag(Arc::clone(&dropped));
        let pending = stream::pending::<Result<u8, Error>>().map(move |item| {
            let _keep = &flag;
            item
        });

        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(10), first_value(pending)).await;
        assert!(outcome.is_err());
        assert!(dropped.load(Ordering::SeqCst));
    }
}
