//! Ticker canonicalisation and provider symbol candidates.

use super::error::TradecastError;
use tracing::warn;

pub const MAX_TICKER_LEN: usize = 15;

/// A ticker reduced to its canonical form plus any warning raised on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTicker {
    pub symbol: String,
    pub suffix: Option<String>,
    pub warning: Option<String>,
}

/// Trim, uppercase and strip an exchange suffix (`aapl.us` -> `AAPL`).
pub fn canonicalize(raw: &str) -> Result<CanonicalTicker, TradecastError> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return Err(TradecastError::InvalidTicker {
            ticker: raw.to_string(),
            reason: "ticker must not be empty".into(),
        });
    }
    if upper.len() > MAX_TICKER_LEN {
        return Err(TradecastError::InvalidTicker {
            ticker: raw.to_string(),
            reason: format!("ticker longer than {MAX_TICKER_LEN} characters"),
        });
    }
    if let Some(c) = upper
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
    {
        return Err(TradecastError::InvalidTicker {
            ticker: raw.to_string(),
            reason: format!("unsupported character '{c}'"),
        });
    }

    let (symbol, suffix) = match upper.split_once('.') {
        Some((base, suffix)) => (base.to_string(), Some(suffix.to_string())),
        None => (upper.clone(), None),
    };
    if symbol.is_empty() {
        return Err(TradecastError::InvalidTicker {
            ticker: raw.to_string(),
            reason: "ticker must not be empty".into(),
        });
    }

    let warning = match suffix.as_deref() {
        Some(s) if s != "US" => {
            let msg = format!("Non-US exchange suffix '.{s}' ignored");
            warn!(ticker = %upper, "{msg}");
            Some(msg)
        }
        _ => None,
    };

    Ok(CanonicalTicker {
        symbol,
        suffix,
        warning,
    })
}

/// Canonical symbol only.
pub fn canonical_ticker(raw: &str) -> Result<String, TradecastError> {
    canonicalize(raw).map(|t| t.symbol)
}

/// Symbols to try against a provider, most specific first.
pub fn provider_candidates(raw: &str) -> Result<Vec<String>, TradecastError> {
    let t = canonicalize(raw)?;
    let us = format!("{}.US", t.symbol);
    let first = match t.suffix {
        Some(s) => format!("{}.{}", t.symbol, s),
        None => t.symbol.clone(),
    };
    if first == us {
        Ok(vec![us])
    } else {
        Ok(vec![first, us])
    }
}
