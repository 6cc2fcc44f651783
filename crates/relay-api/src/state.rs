//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 Axum의 State extractor로 핸들러에 주입됩니다.

use std::sync::Arc;

use relay_core::{BotChannel, RelayError, RelayResult, RelaySettings, SignalRegistry};
use relay_notification::{ChannelGateway, TelegramConfig, TelegramGateway};
use tracing::{info, warn};

use crate::services::{AnchorSource, DeploymentProfile, SignalRouter};

/// `/webhook` 프로파일 이름.
pub const PRIMARY_PROFILE: &str = "primary";
/// `/real-channel` 프로파일 이름.
pub const REAL_PROFILE: &str = "real";

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 열린 신호 레지스트리 (유일한 공유 가변 상태)
    pub registry: Arc<SignalRegistry>,

    /// `/webhook` 라우터 (레지스트리 앵커)
    pub webhook: Arc<SignalRouter>,

    /// `/real-channel` 라우터 (채널 히스토리 앵커). 실거래 봇이 없으면 `None`.
    pub real_channel: Option<Arc<SignalRouter>>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 프로파일에서 상태를 생성합니다.
    pub fn new(
        registry: Arc<SignalRegistry>,
        primary: DeploymentProfile,
        real: Option<DeploymentProfile>,
    ) -> Self {
        Self {
            webhook: Arc::new(SignalRouter::new(primary, registry.clone())),
            real_channel: real.map(|profile| Arc::new(SignalRouter::new(profile, registry.clone()))),
            registry,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 설정에서 텔레그램 게이트웨이와 프로파일을 구성합니다.
    ///
    /// # Errors
    /// 기본 신호 봇이나 홍보 봇 설정이 없으면 `RelayError::Config`를 반환합니다.
    pub fn from_settings(settings: &RelaySettings) -> RelayResult<Self> {
        let signal_bot = settings.signal_bot()?;
        let promotion_bot = settings.promotion_bot()?;
        let mention = settings.mention();

        let primary = DeploymentProfile {
            name: PRIMARY_PROFILE.to_string(),
            signal_channel: signal_bot.channel_id.clone(),
            promotion_channel: promotion_bot.channel_id.clone(),
            anchor: AnchorSource::Registry,
            mention: mention.clone(),
            signal_gateway: telegram_gateway("signal", &signal_bot, settings)?,
            promotion_gateway: telegram_gateway("promotion", &promotion_bot, settings)?,
        };

        // 실거래 봇이 진입/청산과 홍보를 모두 보낸다
        let real = match settings.real_bot() {
            Some(real_bot) => {
                let gateway = telegram_gateway("real", &real_bot, settings)?;
                Some(DeploymentProfile {
                    name: REAL_PROFILE.to_string(),
                    signal_channel: real_bot.channel_id.clone(),
                    promotion_channel: promotion_bot.channel_id.clone(),
                    anchor: AnchorSource::ChannelHistory,
                    mention,
                    signal_gateway: gateway.clone(),
                    promotion_gateway: gateway,
                })
            }
            None => {
                warn!("TELEGRAM_BOT_TOKEN_REAL/TELEGRAM_CHANNEL_ID_REAL not set, /real-channel disabled");
                None
            }
        };

        info!(
            signal_channel = %primary.signal_channel,
            promotion_channel = %primary.promotion_channel,
            real_channel = ?real.as_ref().map(|p| p.signal_channel.to_string()),
            "Deployment profiles configured"
        );

        Ok(Self::new(Arc::new(SignalRegistry::new()), primary, real))
    }

    /// 활성화된 프로파일 이름.
    pub fn profile_names(&self) -> Vec<String> {
        std::iter::once(&self.webhook)
            .chain(self.real_channel.iter())
            .map(|router| router.profile().name.clone())
            .collect()
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

fn telegram_gateway(
    name: &str,
    bot: &BotChannel,
    settings: &RelaySettings,
) -> RelayResult<Arc<dyn ChannelGateway>> {
    let config = TelegramConfig::from_bot(name, bot)
        .with_api_url(settings.telegram_api_url.clone())
        .with_history_depth(settings.channel_history_depth);
    let gateway = TelegramGateway::new(config).map_err(|e| RelayError::Config(e.to_string()))?;
    Ok(Arc::new(gateway))
}

/// 테스트용 상태와 전송 기록 게이트웨이.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use relay_core::ChannelId;
    use relay_notification::MockGateway;

    pub struct TestGateways {
        pub signal: Arc<MockGateway>,
        pub promotion: Arc<MockGateway>,
        pub real: Arc<MockGateway>,
    }

    pub fn create_test_state(with_real: bool) -> (AppState, TestGateways) {
        let gateways = TestGateways {
            signal: Arc::new(MockGateway::with_first_id("signal", 100)),
            promotion: Arc::new(MockGateway::with_first_id("promotion", 500)),
            real: Arc::new(MockGateway::with_first_id("real", 900)),
        };

        let primary = DeploymentProfile {
            name: PRIMARY_PROFILE.to_string(),
            signal_channel: ChannelId::new("@signals"),
            promotion_channel: ChannelId::new("@promo"),
            anchor: AnchorSource::Registry,
            mention: Some("@AI_tradesbot".to_string()),
            signal_gateway: gateways.signal.clone(),
            promotion_gateway: gateways.promotion.clone(),
        };
        let real = with_real.then(|| DeploymentProfile {
            name: REAL_PROFILE.to_string(),
            signal_channel: ChannelId::new("@real"),
            promotion_channel: ChannelId::new("@promo"),
            anchor: AnchorSource::ChannelHistory,
            mention: Some("@AI_tradesbot".to_string()),
            signal_gateway: gateways.real.clone(),
            promotion_gateway: gateways.real.clone(),
        });

        let state = AppState::new(Arc::new(SignalRegistry::new()), primary, real);
        (state, gateways)
    }
}
