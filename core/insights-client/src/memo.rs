//! FILENAME: core/insights-client/src/memo.rs
//! Lazy per-category children.
//!
//! Category tables load only the top level up front. The first expand of a
//! category fetches its brand-level children, and the result is kept for the
//! lifetime of the memo; expanding the same category again never refetches.

use std::sync::{Arc, Mutex, PoisonError};

use drilldown_engine::{find_node, forest_from_json, DrilldownError, DrilldownTable, Level, Node, NodeKey};
use rustc_hash::FxHashMap;

use crate::config::GlobalFilters;
use crate::error::Result;
use crate::query::{QueryParam, QueryParams};
use crate::source::DataSource;

pub struct CategoryMemo<L: Level> {
    source: Arc<dyn DataSource>,
    path: String,
    filters: GlobalFilters,
    cache: Mutex<FxHashMap<String, Vec<Node<L>>>>,
}

impl<L: Level> CategoryMemo<L> {
    /// `path` is the children endpoint; the category goes in `category`.
    pub fn new(source: Arc<dyn DataSource>, path: impl Into<String>, filters: GlobalFilters) -> Self {
        CategoryMemo {
            source,
            path: path.into(),
            filters,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn is_cached(&self, category: &str) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(category)
    }

    /// Children of `category`, fetched on first use.
    pub async fn children(&self, category: &str) -> Result<Vec<Node<L>>> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
            .cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let params = QueryParams::from_filters(&self.filters).with(QueryParam::Category, category);
        let envelope = self.source.fetch(&self.path, &params).await?;
        let children: Vec<Node<L>> = forest_from_json(envelope.into_data()?)?;
        log::debug!("fetched {} children for category '{}'", children.len(), category);

        // An overlapping fetch may have stored first; its result wins.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(category.to_string()).or_insert(children).clone())
    }

    /// Expands the category row at `key`, loading its children first if the
    /// node has none yet. Returns the number of children attached.
    pub async fn expand_category(&self, table: &mut DrilldownTable<L>, key: &NodeKey) -> Result<usize> {
        let (category, loaded) = match find_node(table.forest(), key) {
            Some(node) => (node.label.clone(), !node.children.is_empty()),
            None => return Err(DrilldownError::NodeNotFound(key.to_string()).into()),
        };

        let attached = if loaded {
            0
        } else {
            let children = self.children(&category).await?;
            let count = children.len();
            table.attach_children(key, children)?;
            count
        };

        table.expand(key.clone());
        Ok(attached)
    }
}
