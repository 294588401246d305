//! Post-scoring screening: liquidity percentile filtering, watchlist-board
//! exclusion, ranking and top-K selection.

pub mod liquidity;
pub mod screen;

pub use liquidity::{attach_vol_rank, vol_rank_day};
pub use screen::{rank_descending, screen, top_k, WATCHLIST_BOARD};
