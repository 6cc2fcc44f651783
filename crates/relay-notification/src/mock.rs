//! 테스트용 게이트웨이.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use relay_core::{ChannelId, MessageId};

use crate::history::mentions_symbol;
use crate::types::{ChannelGateway, NotificationError, NotificationResult, OutboundMessage};

/// 보낸 메시지를 기록하는 게이트웨이.
///
/// 메시지 ID는 `first_id`부터 1씩 증가합니다.
#[derive(Debug)]
pub struct MockGateway {
    name: String,
    next_id: AtomicI64,
    failing: AtomicBool,
    sent: Mutex<Vec<(MessageId, OutboundMessage)>>,
}

impl MockGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_first_id(name, 1)
    }

    pub fn with_first_id(name: impl Into<String>, first_id: i64) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicI64::new(first_id),
            failing: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 모든 전송이 실패하는 게이트웨이.
    pub fn failing(name: impl Into<String>) -> Self {
        let gateway = Self::new(name);
        gateway.set_failing(true);
        gateway
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 지금까지 전송에 성공한 메시지.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// 지금까지 전송에 성공한 메시지와 부여된 ID.
    pub fn sent_with_ids(&self) -> Vec<(MessageId, OutboundMessage)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn last_sent(&self) -> Option<OutboundMessage> {
        self.sent().pop()
    }
}

#[async_trait]
impl ChannelGateway for MockGateway {
    async fn send_message(&self, message: &OutboundMessage) -> NotificationResult<MessageId> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed(format!(
                "{} is configured to fail",
                self.name
            )));
        }

        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent
            .lock()
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?
            .push((id, message.clone()));
        Ok(id)
    }

    async fn find_latest_message_with_symbol(
        &self,
        channel: &ChannelId,
        symbol: &str,
    ) -> NotificationResult<Option<MessageId>> {
        let sent = self
            .sent
            .lock()
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
        Ok(sent
            .iter()
            .rev()
            .find(|(_, m)| &m.channel == channel && mentions_symbol(&m.text, symbol))
            .map(|(id, _)| *id))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
