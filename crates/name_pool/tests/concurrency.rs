//! Concurrent interning from many threads.
//!
//! Every thread interns overlapping sets of strings in different casings;
//! afterwards each distinct string must map to exactly one comparison entry.

use name_pool::{
    load_name_batch, save_name_batch, with_str_view, FindName, Name, NameEntryId, NamePool,
    PoolConfig, SharedNamePool,
};
use pretty_assertions::assert_eq;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

const DISTINCT: usize = 4_000;
const TASKS: usize = 64;

fn spelling(index: usize, variant: usize) -> String {
    let base = if index % 7 == 0 {
        format!("\u{3042}Wide{index}")
    } else {
        format!("Stress{index}Name")
    };
    match variant % 3 {
        0 => base,
        1 => base.to_ascii_lowercase(),
        _ => base.to_ascii_uppercase(),
    }
}

fn hammer(pool: &NamePool) -> Vec<Vec<(usize, Name)>> {
    (0..TASKS)
        .into_par_iter()
        .map(|task| {
            (0..DISTINCT)
                .map(|step| {
                    let index = (step * 31 + task * 97) % DISTINCT;
                    (index, pool.intern(&spelling(index, task), FindName::Add))
                })
                .collect()
        })
        .collect()
}

fn assert_one_entry_per_string(results: &[Vec<(usize, Name)>]) -> FxHashMap<usize, Name> {
    let mut first: FxHashMap<usize, Name> = FxHashMap::default();
    for (index, name) in results.iter().flatten() {
        let seen = *first.entry(*index).or_insert(*name);
        assert_eq!(seen, *name, "string {index} interned twice");
    }
    let unique: FxHashSet<_> = first.values().map(|name| name.comparison_id()).collect();
    assert_eq!(unique.len(), first.len());
    first
}

#[test]
fn concurrent_interning_yields_one_id_per_string() {
    let pool = SharedNamePool::new();
    let results = hammer(&pool);
    let names = assert_one_entry_per_string(&results);

    assert_eq!(names.len(), DISTINCT);
    for (index, name) in &names {
        assert!(pool.name_eq_str(*name, &spelling(*index, 0)));
        assert_eq!(pool.find_name(&spelling(*index, 1)), Some(*name));
    }
}

#[test]
fn concurrent_interning_in_case_preserving_pool() {
    let pool = SharedNamePool::with_config(PoolConfig::default().with_case_preserving(true));
    let results = hammer(&pool);
    assert_one_entry_per_string(&results);

    // Every spelling keeps its own casing.
    for index in 0..DISTINCT {
        for variant in 0..3 {
            let text = spelling(index, variant);
            let name = pool.intern(&text, FindName::Find);
            assert_eq!(pool.name_to_string(name), text);
        }
    }
}

#[test]
fn concurrent_readers_and_writers() {
    let pool = SharedNamePool::new();
    let reserved = pool.num_entries() as usize;
    let seeded: Vec<Name> = (0..DISTINCT)
        .map(|index| pool.intern(&spelling(index, 0), FindName::Add))
        .collect();

    (0..TASKS).into_par_iter().for_each(|task| {
        if task % 2 == 0 {
            for index in 0..DISTINCT {
                pool.intern(&format!("Fresh{task}_{index}x"), FindName::Add);
            }
        } else {
            for (index, name) in seeded.iter().enumerate() {
                assert_eq!(pool.plain_name(*name), spelling(index, 0));
            }
        }
    });

    assert_eq!(
        pool.num_entries() as usize,
        reserved + DISTINCT * (TASKS / 2 + 1)
    );
}

#[test]
fn batch_loads_race_with_interning() {
    let source = NamePool::new();
    let ids: Vec<NameEntryId> = (0..DISTINCT)
        .map(|index| with_str_view(&spelling(index, 0), |view| source.store(view)))
        .collect();
    let batch = save_name_batch(&source, &ids);

    for case_preserving in [false, true] {
        let pool = SharedNamePool::with_config(
            PoolConfig::default().with_case_preserving(case_preserving),
        );

        let (loads, interns): (Vec<_>, Vec<_>) = (0..TASKS)
            .into_par_iter()
            .map(|task| {
                if task % 4 == 0 {
                    let loaded = load_name_batch(&pool, &batch.names, &batch.hashes);
                    (Some(loaded), Vec::new())
                } else {
                    let names: Vec<(usize, Name)> = (0..DISTINCT)
                        .rev()
                        .map(|index| (index, pool.intern(&spelling(index, task), FindName::Add)))
                        .collect();
                    (None, vec![names])
                }
            })
            .unzip();

        let loads: Vec<Vec<NameEntryId>> = loads
            .into_iter()
            .flatten()
            .map(|loaded| loaded.unwrap_or_else(|e| panic!("{e}")))
            .collect();
        for loaded in &loads {
            assert_eq!(loaded, &loads[0]);
        }

        let interns: Vec<Vec<(usize, Name)>> = interns.into_iter().flatten().collect();
        let names = assert_one_entry_per_string(&interns);
        for (index, loaded) in loads[0].iter().enumerate() {
            assert_eq!(pool.comparison_id_of(*loaded), names[&index].comparison_id());
            let text = pool.resolve(*loaded).to_string();
            if case_preserving {
                assert_eq!(text, spelling(index, 0));
            } else {
                assert!(text.eq_ignore_ascii_case(&spelling(index, 0)));
            }
        }
    }
}
