use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Shared map of in-flight uploads from display name to percent complete.
///
/// Clones share the same map so a caller can poll while a batch runs.
#[derive(Debug, Clone, Default)]
pub struct UploadProgress {
    entries: Arc<Mutex<BTreeMap<String, u8>>>,
}

impl UploadProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, name: &str, percent: u8) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(name.to_string(), percent.min(100));
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Current percentages, sorted by file name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, u8)> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(name, percent)| (name.clone(), *percent))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.entries.lock().map_or(true, |entries| entries.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let progress = UploadProgress::new();
        let observer = progress.clone();

        progress.set("exam.pdf", 0);
        progress.set("clip.mp4", 250);
        assert_eq!(
            observer.snapshot(),
            vec![("clip.mp4".to_string(), 100), ("exam.pdf".to_string(), 0)]
        );

        progress.clear();
        assert!(observer.is_idle());
    }
}
