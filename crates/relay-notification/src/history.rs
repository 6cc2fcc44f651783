//! 전송 메시지 히스토리.
//!
//! Bot API로는 채널 과거 메시지를 읽을 수 없으므로, 게이트웨이가 직접 보낸
//! 메시지를 채널별로 최근 `depth`개까지 기억하고 그 안에서만 검색합니다.

use std::collections::{HashMap, VecDeque};

use relay_core::{ChannelId, MessageId};
use tokio::sync::Mutex;

/// 채널별 최근 전송 메시지 (유한 버퍼).
#[derive(Debug)]
pub struct SentHistory {
    depth: usize,
    channels: Mutex<HashMap<ChannelId, VecDeque<(MessageId, String)>>>,
}

impl SentHistory {
    /// 채널별 최대 `depth`개를 기억하는 히스토리를 생성합니다.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// 검색 깊이.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 전송된 메시지를 기록합니다. 가장 오래된 항목부터 밀려납니다.
    pub async fn record(&self, channel: &ChannelId, message_id: MessageId, text: &str) {
        if self.depth == 0 {
            return;
        }
        let mut channels = self.channels.lock().await;
        let entries = channels.entry(channel.clone()).or_default();
        if entries.len() >= self.depth {
            entries.pop_front();
        }
        entries.push_back((message_id, text.to_string()));
    }

    /// `#<symbol>` 해시태그를 포함한 가장 최근 메시지 ID.
    pub async fn find_latest(&self, channel: &ChannelId, symbol: &str) -> Option<MessageId> {
        let channels = self.channels.lock().await;
        channels.get(channel)?.iter().rev().find_map(|(id, text)| {
            mentions_symbol(text, symbol).then_some(*id)
        })
    }
}

/// 텍스트가 `#<symbol>` 해시태그를 포함하는지 확인합니다.
///
/// `#OM/USDT`는 `#OM/USDTX`나 `#OM/USDT/BTC`와 일치하지 않습니다.
pub fn mentions_symbol(text: &str, symbol: &str) -> bool {
    if symbol.is_empty() {
        return false;
    }
    let tag = format!("#{}", symbol);
    text.match_indices(&tag).any(|(idx, _)| {
        text[idx + tag.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '/')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentions_symbol_boundaries() {
        assert!(mentions_symbol("🟢 Long\n\n#OM/USDT\n\nEntry", "OM/USDT"));
        assert!(mentions_symbol("#OM/USDT #long\nClose the Signal", "OM/USDT"));
        assert!(mentions_symbol("\\#LONG \\#OM/USDT", "OM/USDT"));
        assert!(!mentions_symbol("#OM/USDTX", "OM/USDT"));
        assert!(!mentions_symbol("OM/USDT without tag", "OM/USDT"));
        assert!(!mentions_symbol("#anything", ""));
    }

    #[tokio::test]
    async fn test_find_latest_prefers_newest() {
        let history = SentHistory::new(10);
        let channel = ChannelId::new("@real");
        history.record(&channel, MessageId(1), "#OM/USDT first").await;
        history.record(&channel, MessageId(2), "#BTC/USDT other").await;
        history.record(&channel, MessageId(3), "#OM/USDT second").await;

        assert_eq!(history.find_latest(&channel, "OM/USDT").await, Some(MessageId(3)));
        assert_eq!(history.find_latest(&channel, "ETH/USDT").await, None);
        assert_eq!(
            history.find_latest(&ChannelId::new("@other"), "OM/USDT").await,
            None
        );
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let history = SentHistory::new(2);
        let channel = ChannelId::new("@real");
        history.record(&channel, MessageId(1), "#OM/USDT").await;
        history.record(&channel, MessageId(2), "#BTC/USDT").await;
        history.record(&channel, MessageId(3), "#ETH/USDT").await;

        // 가장 오래된 메시지는 검색 범위를 벗어났다
        assert_eq!(history.find_latest(&channel, "OM/USDT").await, None);
        assert_eq!(history.find_latest(&channel, "BTC/USDT").await, Some(MessageId(2)));
    }

    #[tokio::test]
    async fn test_zero_depth_records_nothing() {
        let history = SentHistory::new(0);
        let channel = ChannelId::new("@real");
        history.record(&channel, MessageId(1), "#OM/USDT").await;
        assert_eq!(history.find_latest(&channel, "OM/USDT").await, None);
    }
}
