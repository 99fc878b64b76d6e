//! Keyset-paginated consumer enumeration
//!
//! Consumers of an owner are listed by id ascending, then last check-in
//! ascending with "never checked in" first. Each page carries an opaque cursor
//! naming the last consumer it returned; the next page starts strictly after
//! that consumer's id, so inserts and check-ins between calls never cause a
//! consumer to be returned twice.

use std::sync::Arc;

use tracing::debug;
use warrant_common::{WarrantError, is_blank};
use warrant_persistence::{ConsumerCursor, ConsumerInfo, PersistenceService};

use crate::cursor::CursorCodec;
use crate::model::{ConsumerPage, FeedOptions};

/// Lists an owner's consumers page by page
pub struct ConsumerFeedService {
    persistence: Arc<dyn PersistenceService>,
    codec: CursorCodec,
    options: FeedOptions,
}

impl ConsumerFeedService {
    pub fn new(persistence: Arc<dyn PersistenceService>, codec: CursorCodec) -> Self {
        Self {
            persistence,
            codec,
            options: FeedOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FeedOptions) -> Self {
        self.options = FeedOptions::new(options.default_page_size, options.max_page_size);
        self
    }

    pub fn codec(&self) -> &CursorCodec {
        &self.codec
    }

    /// Effective page size for a requested limit.
    ///
    /// `None` is the default page size, a limit above the maximum is clamped,
    /// and a limit of zero or less is rejected with `InvalidCursor`.
    pub fn page_size(&self, limit: Option<i64>) -> Result<u64, WarrantError> {
        match limit {
            None => Ok(self.options.default_page_size.min(self.options.max_page_size)),
            Some(l) if l <= 0 => Err(WarrantError::InvalidCursor(format!(
                "limit must be positive, got {}",
                l
            ))),
            Some(l) => Ok((l as u64).min(self.options.max_page_size)),
        }
    }

    /// One page of the consumers of `owner_id`.
    ///
    /// A blank or unknown owner yields an empty, final page.
    pub async fn list_consumers(
        &self,
        owner_id: &str,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<ConsumerPage, WarrantError> {
        let after = self.codec.decode_optional(cursor)?;
        let page_size = self.page_size(limit)?;

        if is_blank(Some(owner_id)) {
            return Ok(ConsumerPage::empty());
        }

        self.fetch_page(owner_id, after.as_ref(), page_size).await
    }

    /// Same as [`Self::list_consumers`], addressing the owner by its natural key
    pub async fn list_consumers_by_owner_key(
        &self,
        owner_key: &str,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<ConsumerPage, WarrantError> {
        let after = self.codec.decode_optional(cursor)?;
        let page_size = self.page_size(limit)?;

        if is_blank(Some(owner_key)) {
            return Ok(ConsumerPage::empty());
        }

        match self.persistence.owner_find_by_key(owner_key).await? {
            Some(owner) => self.fetch_page(&owner.id, after.as_ref(), page_size).await,
            None => {
                debug!(owner_key, "Unknown owner key, returning empty page");
                Ok(ConsumerPage::empty())
            }
        }
    }

    async fn fetch_page(
        &self,
        owner_id: &str,
        after: Option<&ConsumerCursor>,
        page_size: u64,
    ) -> Result<ConsumerPage, WarrantError> {
        // One extra row tells whether another page exists
        let mut consumers: Vec<ConsumerInfo> = self
            .persistence
            .consumer_find_page(owner_id, after, page_size.saturating_add(1))
            .await?;

        let has_more = consumers.len() as u64 > page_size;
        consumers.truncate(page_size as usize);

        let next_cursor = match consumers.last() {
            Some(last) if has_more => {
                Some(self.codec.encode(&ConsumerCursor::from_consumer(last))?)
            }
            _ => None,
        };

        debug!(
            owner_id,
            after = after.map(|c| c.after_id.as_str()),
            page_size,
            returned = consumers.len(),
            has_more,
            "Listed consumers"
        );

        Ok(ConsumerPage {
            consumers,
            next_cursor,
        })
    }
}
