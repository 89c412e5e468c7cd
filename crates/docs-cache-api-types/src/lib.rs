//! Request shapes shared between the docs-cache server and its clearing tool.

use serde::{Deserialize, Serialize};

/// Body of `POST /cache/invalidate`.
///
/// `objects` holds cache keys: the decoded path below the cached namespace,
/// e.g. `default/component/service/index.html`. Order is preserved and
/// duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateCacheRequest {
    #[serde(default)]
    pub objects: Vec<String>,
}

impl InvalidateCacheRequest {
    pub fn new(objects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
