//! Error handling for the application

use thiserror::Error;

use crate::shared::types::{Address, FeedId};

/// Fixed-point arithmetic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Token ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token not found: {0}")]
    UnknownToken(Address),

    #[error("Insufficient balance: {owner} holds {available}, needs {required}")]
    InsufficientBalance {
        owner: Address,
        available: u128,
        required: u128,
    },

    #[error("Insufficient allowance: {spender} may spend {available} of {owner}, needs {required}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: u128,
        required: u128,
    },

    #[error("{caller} is not allowed to mint or burn this token")]
    Unauthorized { caller: Address },

    #[error("Token supply overflow")]
    SupplyOverflow,
}

/// Price oracle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Insufficient oracle fee: required {required}, provided {provided}")]
    InsufficientFee { required: u128, provided: u128 },

    #[error("Price feed not found: {0}")]
    PriceFeedNotFound(FeedId),

    #[error("Stale price for {feed_id}: published at {publish_time}, now {now}, max age {max_age}s")]
    StalePrice {
        feed_id: FeedId,
        publish_time: i64,
        now: i64,
        max_age: u64,
    },

    #[error("Invalid oracle quote: price {price}, expo {expo}")]
    InvalidQuote { price: i64, expo: i32 },

    #[error("Confidence interval too wide: conf {conf} on price {price}")]
    ConfidenceTooWide { price: i64, conf: u64 },

    #[error("Malformed price update payload: {0}")]
    MalformedPayload(String),

    #[error("Price conversion failed: {0}")]
    Conversion(#[from] MathError),
}

/// Liquidity ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiquidityError {
    #[error("Invalid liquidity amount: {0}")]
    ZeroAmount(&'static str),

    #[error("Insufficient LP shares: holds {held}, requested {requested}")]
    InsufficientShares { held: u128, requested: u128 },

    #[error("Payout ({base_out}, {quote_out}) exceeds reserves ({base_reserve}, {quote_reserve})")]
    PayoutExceedsReserves {
        base_out: u128,
        quote_out: u128,
        base_reserve: u128,
        quote_reserve: u128,
    },

    #[error("Pool has outstanding shares but no base reserve")]
    DrainedReserves,

    #[error("LP supply {supply} does not match recorded positions {positions}")]
    SupplyMismatch { supply: u128, positions: u128 },
}

/// Swap engine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("Swap size must be positive")]
    ZeroSize,

    #[error("Quote price is zero")]
    ZeroQuotePrice,
}

/// Administrative authorization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Admin capability required")]
    MissingCapability,

    #[error("Admin capability does not match this pool")]
    WrongCapability,
}

/// Any failure that aborts a pool transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Liquidity(#[from] LiquidityError),

    #[error(transparent)]
    Swap(#[from] SwapError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("State store error: {0}")]
    StateError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Transaction reverted: {0}")]
    Reverted(#[from] PoolError),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StateError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StateError(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}
