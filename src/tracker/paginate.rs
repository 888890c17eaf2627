//! Restartable page-by-page iteration over tracker list endpoints.
//!
//! The tracker paginates with `page` + `size` query params and no cursor
//! tokens: a full page means more data may follow, a short page is the end.
//! A dataset that is an exact multiple of the page size therefore costs one
//! extra fetch that comes back empty before the cursor stops.

use async_trait::async_trait;

use super::TrackerError;

/// One page-addressable endpoint. Implemented by the client's endpoint views
/// and by in-process fakes in tests.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Fetch page `page` (1-based) of at most `size` items.
    async fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<Self::Item>, TrackerError>;
}

/// Pull-based cursor over a [`PageSource`]. Every cursor starts at page 1
/// and owns its position; nothing is shared between invocations, so a
/// restarted job re-pulls from the beginning.
pub struct PageCursor<'a, S: PageSource> {
    source: &'a S,
    size: u32,
    page: u32,
    done: bool,
}

impl<'a, S: PageSource> PageCursor<'a, S> {
    pub fn new(source: &'a S, size: u32) -> Self {
        Self {
            source,
            size,
            page: 1,
            done: false,
        }
    }

    /// Fetch the next page, or `None` once a short page ended the stream.
    pub async fn next_page(&mut self) -> Result<Option<Vec<S::Item>>, TrackerError> {
        if self.done {
            return Ok(None);
        }

        let batch = self.source.fetch_page(self.page, self.size).await?;
        if (batch.len() as u32) < self.size {
            self.done = true;
        }
        self.page += 1;

        if batch.is_empty() {
            return Ok(None);
        }
        Ok(Some(batch))
    }

    /// Drain all remaining pages into one vector.
    pub async fn collect_all(mut self) -> Result<Vec<S::Item>, TrackerError> {
        let mut all = Vec::new();
        while let Some(mut batch) = self.next_page().await? {
            all.append(&mut batch);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serves `total` numbered items, slicing honest pages out of the full
    /// range and counting how many fetches were made.
    struct NumberedPages {
        total: u32,
        fetches: AtomicU32,
    }

    impl NumberedPages {
        fn new(total: u32) -> Self {
            Self {
                total,
                fetches: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for NumberedPages {
        type Item = u32;

        async fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<u32>, TrackerError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let start = (page - 1) * size;
            let end = (start + size).min(self.total);
            if start >= self.total {
                return Ok(Vec::new());
            }
            Ok((start..end).collect())
        }
    }

    #[tokio::test]
    async fn short_final_page_ends_the_stream() {
        // 201 items at size 200: one full page, one short page, no third fetch.
        let source = NumberedPages::new(201);
        let items = PageCursor::new(&source, 200).collect_all().await.unwrap();

        assert_eq!(items.len(), 201);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exact_multiple_costs_one_empty_fetch() {
        // 400 items at size 200: two full pages, then an empty third fetch.
        let source = NumberedPages::new(400);
        let items = PageCursor::new(&source, 200).collect_all().await.unwrap();

        assert_eq!(items.len(), 400);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exactly_one_page_costs_one_empty_fetch() {
        let source = NumberedPages::new(200);
        let items = PageCursor::new(&source, 200).collect_all().await.unwrap();

        assert_eq!(items.len(), 200);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_dataset_is_one_fetch_and_no_items() {
        let source = NumberedPages::new(0);
        let mut cursor = PageCursor::new(&source, 200);

        assert!(cursor.next_page().await.unwrap().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        // The cursor stays finished without fetching again
        assert!(cursor.next_page().await.unwrap().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cursors_do_not_share_position() {
        let source = NumberedPages::new(30);

        let first = PageCursor::new(&source, 20).collect_all().await.unwrap();
        let second = PageCursor::new(&source, 20).collect_all().await.unwrap();

        assert_eq!(first, second, "each cursor restarts at page 1");
    }

    #[tokio::test]
    async fn fetch_errors_propagate() {
        struct Failing;

        #[async_trait]
        impl PageSource for Failing {
            type Item = u32;

            async fn fetch_page(&self, _page: u32, _size: u32) -> Result<Vec<u32>, TrackerError> {
                Err(TrackerError::Api {
                    status: 500,
                    message: "boom".to_string(),
                    retry_after: None,
                })
            }
        }

        let result = PageCursor::new(&Failing, 200).collect_all().await;
        assert!(matches!(result, Err(TrackerError::Api { status: 500, .. })));
    }
}
