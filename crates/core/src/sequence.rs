//! Multi-valued lazy sequences.

use futures::stream::{self, BoxStream, StreamExt};

use crate::pipeline::Pipeline;

/// A lazily produced, ordered sequence of values.
pub struct Sequence<T> {
    items: BoxStream<'static, T>,
}

impl<T: Send + 'static> Sequence<T> {
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            items: stream::iter(items).boxed(),
        }
    }

    /// Consume element by element.
    pub fn into_stream(self) -> BoxStream<'static, T> {
        self.items
    }

    /// Realize the whole sequence as a single value.
    pub fn collect_list(self) -> Pipeline<Vec<T>> {
        Pipeline::from_future(async move { Ok(self.items.collect::<Vec<_>>().await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lazy_and_eager_consumption_agree_on_order() {
        let names = ["Steve", "Mary", "Peter"];

        let streamed: Vec<&str> = Sequence::from_items(names).into_stream().collect().await;
        let collected = Sequence::from_items(names)
            .collect_list()
            .await_single()
            .await
            .unwrap();

        assert_eq!(streamed, vec!["Steve", "Mary", "Peter"]);
        assert_eq!(collected, streamed);
    }
}
