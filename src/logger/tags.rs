/// Log tags identifying the subsystem that emitted a message

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Rpc,
    Scanner,
    Metadata,
    Batch,
    Cache,
    Sync,
}

impl LogTag {
    /// Every tag, in display order
    pub const ALL: [LogTag; 7] = [
        LogTag::System,
        LogTag::Rpc,
        LogTag::Scanner,
        LogTag::Metadata,
        LogTag::Batch,
        LogTag::Cache,
        LogTag::Sync,
    ];

    /// Plain uppercase label used in console and file output
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Rpc => "RPC",
            LogTag::Scanner => "SCANNER",
            LogTag::Metadata => "METADATA",
            LogTag::Batch => "BATCH",
            LogTag::Cache => "CACHE",
            LogTag::Sync => "SYNC",
        }
    }

    /// Key used by `--debug-<key>` flags and `logging.debug_tags`
    pub fn to_debug_key(&self) -> String {
        self.to_plain_string().to_lowercase()
    }

    pub fn from_debug_key(key: &str) -> Option<LogTag> {
        LogTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.to_debug_key() == key.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_key_round_trip() {
        for tag in LogTag::ALL {
            assert_eq!(LogTag::from_debug_key(&tag.to_debug_key()), Some(tag));
        }
        assert_eq!(LogTag::from_debug_key("METADATA"), Some(LogTag::Metadata));
        assert_eq!(LogTag::from_debug_key("pool"), None);
    }
}
