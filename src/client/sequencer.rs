use std::sync::atomic::{AtomicU64, Ordering};

/// Étiquette monotone attachée à une requête
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTag(u64);

/// Une réponse n'est appliquée que si son étiquette est la dernière émise
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTag {
        RequestTag(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_latest(&self, tag: RequestTag) -> bool {
        self.latest.load(Ordering::SeqCst) == tag.0
    }
}
