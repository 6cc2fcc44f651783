//! 채널 메시지 포맷터.
//!
//! 신호 페이로드를 채널 텍스트로 바꾸는 순수 함수 모음입니다.
//! 부수 효과가 없고 결정적입니다.
//!
//! - 심볼 정규화 (`OMUSDT.P` → `OM/USDT`)
//! - 원본 소수 자릿수를 보존하는 가격 포맷
//! - 고정 포지션 정책(100 USDT, 20x) 기반 수익 계산
//! - Telegram MarkdownV2 이스케이프

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::event::TakeProfitStage;
use crate::types::{PriceInput, Side};

/// 무기한 선물 심볼 접미사.
const PERPETUAL_SUFFIX: &str = ".P";
/// 기본 호가 통화.
const QUOTE_CURRENCY: &str = "USDT";
/// 진입 구간 상단 배수 (진입가 + 1%).
const SECOND_ENTRY_MULTIPLIER: Decimal = dec!(1.01);
/// 홍보 메시지 가격 표기 자릿수.
const PROMOTION_PRICE_DECIMALS: u32 = 8;
/// MarkdownV2 예약 문자.
const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];
/// 홍보 메시지의 가입 링크 (이미 이스케이프됨).
const SIGN_UP_LINK: &str = "https://ai\\-trade\\.io/sign\\-up";

/// 수익 계산에 쓰이는 고정 포지션 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPolicy {
    /// 포지션 크기 (USDT)
    pub position_size: Decimal,
    /// 레버리지 배수
    pub leverage: Decimal,
}

impl Default for PositionPolicy {
    fn default() -> Self {
        Self {
            position_size: dec!(100),
            leverage: dec!(20),
        }
    }
}

/// 심볼을 `BASE/QUOTE` 형식으로 정규화합니다.
///
/// 1. 공백 제거 후 대문자로 변환하고 첫 `.P` 접미사를 제거합니다.
/// 2. 이미 `/`가 있으면 그대로 반환합니다.
/// 3. `USDT`로 끝나면 그 앞에 `/`를 넣습니다.
/// 4. 그 외에는 앞 3글자 뒤에 `/`를 넣습니다.
///
/// 4번은 휴리스틱이라 기준 통화 티커가 3글자가 아니면 잘못된 결과가 나옵니다.
pub fn normalize_symbol(raw: &str) -> String {
    let clean = raw.trim().to_uppercase().replacen(PERPETUAL_SUFFIX, "", 1);

    if clean.contains('/') {
        return clean;
    }

    if let Some(base) = clean.strip_suffix(QUOTE_CURRENCY) {
        return format!("{}/{}", base, QUOTE_CURRENCY);
    }

    let split = clean
        .char_indices()
        .nth(3)
        .map(|(idx, _)| idx)
        .unwrap_or(clean.len());
    format!("{}/{}", &clean[..split], &clean[split..])
}

/// 가격을 원본 소수 자릿수 그대로 표기합니다.
///
/// 숫자로 해석할 수 없으면 원본 값을 그대로 반환합니다.
/// 뒤쪽 0은 제거되며, 자릿수를 채우거나 자르지 않습니다.
pub fn format_price(price: &PriceInput) -> String {
    match price.to_decimal() {
        Some(value) => value.normalize().to_string(),
        None => price.raw(),
    }
}

/// 포맷된 가격 문자열의 소수점 이하 자릿수.
pub fn decimal_places(formatted: &str) -> u32 {
    formatted
        .split_once('.')
        .map(|(_, frac)| frac.chars().count() as u32)
        .unwrap_or(0)
}

/// 진입 구간 상단 가격 (`진입가 * 1.01`)을 `decimals` 자리로 반올림해 표기합니다.
///
/// 진입가가 숫자가 아니면 `None`.
pub fn compute_second_entry(entry_price: &PriceInput, decimals: u32) -> Option<String> {
    let entry = entry_price.to_decimal()?;
    let upper = entry
        .checked_mul(SECOND_ENTRY_MULTIPLIER)?
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    Some(format!("{:.*}", decimals as usize, upper))
}

/// 포지션 손익을 계산합니다.
///
/// - long: `(size * leverage / entry) * (exit - entry)`
/// - short: `(size * leverage / entry) * (entry - exit)`
///
/// 진입가가 0이거나 계산이 범위를 넘으면 `None`.
pub fn compute_profit(
    side: Side,
    position_size: Decimal,
    leverage: Decimal,
    entry_price: Decimal,
    exit_price: Decimal,
) -> Option<Decimal> {
    let quantity = position_size
        .checked_mul(leverage)?
        .checked_div(entry_price)?;
    let delta = match side {
        Side::Long => exit_price.checked_sub(entry_price)?,
        Side::Short => entry_price.checked_sub(exit_price)?,
    };
    quantity.checked_mul(delta)
}

/// Telegram MarkdownV2 예약 문자를 백슬래시로 이스케이프합니다.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 목표가/손절가 표기. 숫자는 [`format_price`]를 거치고 문자열은 그대로 둡니다.
fn display_value(value: &PriceInput) -> String {
    if value.is_number() {
        format_price(value)
    } else {
        value.raw()
    }
}

/// 신규 진입 메시지를 만듭니다.
///
/// ```text
/// 🟢 Long
///
/// #OM/USDT
///
/// Entry : 7.53114 - 7.60645
///
///
/// Targets :
///
/// 🎯 7.7
/// 🎯 7.9
///
///
/// 🛑 Stop : 7.1
///
///
/// @AI_tradesbot
/// ```
pub fn format_entry_message(
    side: Side,
    symbol: &str,
    entry_price: &PriceInput,
    targets: &[PriceInput],
    stop_loss: &PriceInput,
    mention: Option<&str>,
) -> String {
    let side_text = match side {
        Side::Long => "🟢 Long",
        Side::Short => "🔴 SHORT",
    };

    let entry_text = format_price(entry_price);
    let entry_line = match compute_second_entry(entry_price, decimal_places(&entry_text)) {
        Some(upper) => format!("Entry : {} - {}", entry_text, upper),
        None => format!("Entry : {}", entry_text),
    };

    let mut targets_block = String::from("Targets :\n\n");
    for target in targets {
        targets_block.push_str("🎯 ");
        targets_block.push_str(&display_value(target));
        targets_block.push('\n');
    }

    let stop_line = format!("🛑 Stop : {}", display_value(stop_loss));

    let mut message = format!(
        "{side_text}\n\n#{symbol}\n\n{entry_line}\n\n\n{targets_block}\n\n{stop_line}"
    );
    if let Some(mention) = mention {
        message.push_str("\n\n\n");
        message.push_str(mention);
    }
    message
}

/// 청산 메시지를 만듭니다: `#<symbol> #<side>\nClose the Signal`.
pub fn format_close_message(symbol: &str, side: Side) -> String {
    format!("#{} #{}\nClose the Signal", symbol, side)
}

/// 손익을 계산할 수 없을 때 홍보 메시지에 들어가는 값.
const PROFIT_UNAVAILABLE: &str = "n/a";

/// 익절 결과 (홍보 메시지 입력).
///
/// 가격은 원본 입력을 유지합니다. 숫자가 아닌 가격은 그대로 표기되고
/// 손익은 `None`이 됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResult {
    /// 정규화된 심볼
    pub symbol: String,
    /// 포지션 방향
    pub side: Side,
    /// 진입가
    pub entry_price: PriceInput,
    /// 익절가
    pub exit_price: PriceInput,
    /// 정책 기준 손익 (USDT). 가격이 숫자가 아니거나 진입가가 0이면 `None`.
    pub profit: Option<Decimal>,
    /// 익절 단계
    pub stage: TakeProfitStage,
}

impl TradeResult {
    /// 가격 입력에서 결과를 계산합니다.
    pub fn compute(
        symbol: &str,
        side: Side,
        entry_price: &PriceInput,
        exit_price: &PriceInput,
        stage: TakeProfitStage,
        policy: &PositionPolicy,
    ) -> Self {
        let profit = entry_price
            .to_decimal()
            .zip(exit_price.to_decimal())
            .and_then(|(entry, exit)| {
                compute_profit(side, policy.position_size, policy.leverage, entry, exit)
            });

        Self {
            symbol: symbol.to_string(),
            side,
            entry_price: entry_price.clone(),
            exit_price: exit_price.clone(),
            profit,
            stage,
        }
    }
}

fn fixed(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", decimals as usize, rounded)
}

fn promotion_price(price: &PriceInput) -> String {
    match price.to_decimal() {
        Some(value) => fixed(value, PROMOTION_PRICE_DECIMALS),
        None => price.raw(),
    }
}

/// 익절 홍보 메시지 (MarkdownV2)를 만듭니다. 모든 값은 이스케이프됩니다.
pub fn format_promotion_message(
    result: &TradeResult,
    policy: &PositionPolicy,
    mention: Option<&str>,
) -> String {
    let side = escape_markdown_v2(result.side.as_upper());
    let symbol = escape_markdown_v2(&result.symbol);
    let entry = escape_markdown_v2(&promotion_price(&result.entry_price));
    let exit = escape_markdown_v2(&promotion_price(&result.exit_price));
    let profit = escape_markdown_v2(&result.profit.map_or_else(
        || PROFIT_UNAVAILABLE.to_string(),
        |profit| fixed(profit, PROMOTION_PRICE_DECIMALS),
    ));
    let label = escape_markdown_v2(result.stage.price_label());
    let position_size = escape_markdown_v2(&policy.position_size.normalize().to_string());
    let leverage = escape_markdown_v2(&policy.leverage.normalize().to_string());

    let mut message = format!(
        "🔥 *Trading Bot Results* 🔥\n\n\
         📊 *Results:* \\#{side} \\#{symbol}\n\
         💰 *Entry Price:* `{entry}`\n\
         🎯 *{label}* `{exit}`\n\
         📈 *Profit:* `{profit}` USDT\n\
         📊 *Position Size:* `{position_size}` USDT\n\n\
         📈 *Leverage:* {leverage}x\n\n\
         🚀 *Enjoy profit from the free automated trading bot\\!* \n\
         👉 Click the link, then [*START*]({SIGN_UP_LINK})"
    );
    if let Some(mention) = mention {
        message.push_str("\n\n");
        message.push_str(&escape_markdown_v2(mention));
    }
    message
}
