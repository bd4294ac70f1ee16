/// Expected blocks per day on the target chain (ten minute target spacing)
pub const DEFAULT_BLOCKS_PER_DAY: u64 = 144;

/// Fallback cooldown when a throttled response carries no Retry-After hint
pub const DEFAULT_THROTTLE_SECS: u64 = 60;

/// Lifetime assumed for an access token whose response omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 300;

/// Tokens are refreshed this long before they expire
pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 30;

pub const BLOCKS_PREFIX: &str = "blocks/";
pub const FEE_SAMPLES_PREFIX: &str = "fees/historical/";
pub const CHECKPOINTS_PREFIX: &str = "checkpoints/";

/// Upstream endpoints, relative to the API base URL
pub const TIP_HEIGHT_PATH: &str = "blocks/tip/height";
pub const FEE_ESTIMATES_PATH: &str = "fee-estimates";
pub const MEMPOOL_PATH: &str = "mempool";

pub fn block_hash_path(height: u64) -> String {
    format!("block-height/{height}")
}

pub fn block_path(hash: &str) -> String {
    format!("block/{hash}")
}

pub fn block_txs_path(hash: &str) -> String {
    format!("block/{hash}/txs")
}
