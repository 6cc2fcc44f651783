//! API 서버 서비스 계층.

pub mod signal_router;

pub use signal_router::{
    AnchorSource, DeploymentProfile, SignalRouter, WebhookOutcome, STATUS_CLOSE_SENT,
    STATUS_MESSAGE_SENT,
};
