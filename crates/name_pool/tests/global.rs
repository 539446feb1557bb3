//! Lifecycle of the process-wide pool.
//!
//! Kept in its own test binary since teardown is irreversible.

use name_pool::{global_pool, is_available, tear_down, FindName, WellKnownName};
use pretty_assertions::assert_eq;

#[test]
fn global_pool_lifecycle() {
    assert!(is_available());

    let pool = global_pool();
    let name = pool.intern("GlobalActor_4", FindName::Add);
    assert_eq!(global_pool().name_to_string(name), "GlobalActor_4");
    assert_eq!(pool.to_well_known(pool.intern("box", FindName::Find)), Some(WellKnownName::Box));

    assert!(tear_down());
    assert!(!is_available());
    assert!(!tear_down());

    // Handles taken before teardown keep working.
    assert_eq!(pool.plain_name(name), "GlobalActor");

    let reuse = std::panic::catch_unwind(global_pool);
    assert!(reuse.is_err());
}
