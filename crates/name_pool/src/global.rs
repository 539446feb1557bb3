//! Process-wide pool.
//!
//! The global pool is built on first use from [`PoolConfig::from_env`] and
//! lives until [`tear_down`]. Using it after teardown is a bug and panics.

use parking_lot::RwLock;

use crate::config::PoolConfig;
use crate::pool::SharedNamePool;

enum GlobalState {
    Uninitialized,
    Live(SharedNamePool),
    TornDown,
}

static GLOBAL: RwLock<GlobalState> = parking_lot::const_rwlock(GlobalState::Uninitialized);

/// Handle to the global pool, creating it if needed.
///
/// # Panics
/// Panics if called after [`tear_down`].
pub fn global_pool() -> SharedNamePool {
    if let GlobalState::Live(pool) = &*GLOBAL.read() {
        return pool.clone();
    }

    let mut state = GLOBAL.write();
    match &*state {
        GlobalState::Live(pool) => pool.clone(),
        GlobalState::Uninitialized => {
            let config = PoolConfig::from_env();
            tracing::info!(
                case_preserving = config.case_preserving,
                max_name_len = config.max_name_len,
                "creating global name pool"
            );
            let pool = SharedNamePool::with_config(config);
            *state = GlobalState::Live(pool.clone());
            pool
        }
        GlobalState::TornDown => {
            tracing::error!("global name pool used after teardown");
            panic!("global name pool used after teardown");
        }
    }
}

/// Releases the global pool. Returns whether it was live.
///
/// Handles obtained earlier stay valid; later calls to [`global_pool`] panic.
pub fn tear_down() -> bool {
    let previous = std::mem::replace(&mut *GLOBAL.write(), GlobalState::TornDown);
    match previous {
        GlobalState::Live(pool) => {
            pool.log_stats();
            tracing::info!("global name pool torn down");
            true
        }
        GlobalState::Uninitialized | GlobalState::TornDown => false,
    }
}

/// Whether [`global_pool`] can still be called.
pub fn is_available() -> bool {
    !matches!(*GLOBAL.read(), GlobalState::TornDown)
}
