use kovan_dstm::Stm;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
#[cfg_attr(miri, ignore)]
fn test_two_threads_ten_thousand_increments() {
    let stm = Arc::new(Stm::new());
    let var = stm.tvar(0i64);

    let mut handles = vec![];
    for _ in 0..2 {
        let stm = stm.clone();
        let var = var.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..10_000 {
                stm.atomically(|tx| {
                    let x = tx.read(&var)?;
                    tx.write(&var, x + 1)?;
                    Ok(())
                });
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let val = stm.atomically(|tx| tx.read(&var));
    assert_eq!(val, 20_000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_concurrent_counter() {
    let stm = Arc::new(Stm::new());
    let var = stm.tvar(0i64);

    let threads = 8;
    let increments = 100;

    let mut handles = vec![];
    for _ in 0..threads {
        let stm = stm.clone();
        let var = var.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..increments {
                stm.atomically(|tx| {
                    let v = tx.read(&var)?;
                    tx.write(&var, v + 1)?;
                    Ok(())
                });
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let val = stm.atomically(|tx| tx.read(&var));
    assert_eq!(val, threads * increments);

    let stats = stm.stats();
    assert_eq!(stats.commits, (threads * increments + 1) as u64);
    assert_eq!(stats.started, stats.commits + stats.aborts);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_pairs_stay_in_lockstep() {
    let stm = Arc::new(Stm::new());
    let a = stm.tvar(0u64);
    let b = stm.tvar(0u64);
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let stm = stm.clone();
            let a = a.clone();
            let b = b.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    stm.atomically(|tx| {
                        let va = tx.read(&a)?;
                        tx.write(&a, va + 1)?;
                        let vb = tx.read(&b)?;
                        tx.write(&b, vb + 1)?;
                        Ok(())
                    });
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let stm = stm.clone();
            let a = a.clone();
            let b = b.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::Relaxed) {
                    let (va, vb) = stm.atomically(|tx| {
                        let va = tx.read(&a)?;
                        let vb = tx.read(&b)?;
                        // Never a torn view, not even in an attempt that later aborts.
                        assert_eq!(va, vb, "torn read inside transaction");
                        Ok((va, vb))
                    });
                    assert_eq!(va, vb);
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for h in readers {
        h.join().unwrap();
    }

    let (va, vb) = stm.atomically(|tx| Ok((tx.read(&a)?, tx.read(&b)?)));
    assert_eq!((va, vb), (1000, 1000));
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_intermediate_writes_never_observed() {
    let stm = Arc::new(Stm::new());
    let var = stm.tvar(0u64);
    let done = Arc::new(AtomicBool::new(false));

    let writers: Vec<_> = (0..2)
        .map(|_| {
            let stm = stm.clone();
            let var = var.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    stm.atomically(|tx| {
                        let x = tx.read(&var)?;
                        tx.write(&var, x + 1)?;
                        // Give readers a window to abort us while the odd value is installed.
                        if i % 4 == 0 {
                            thread::yield_now();
                        }
                        tx.write(&var, x + 2)?;
                        Ok(())
                    });
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let stm = stm.clone();
            let var = var.clone();
            let done = done.clone();
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let v = stm.atomically(|tx| {
                        let v = tx.read(&var)?;
                        assert_eq!(v % 2, 0, "observed uncommitted intermediate value {v}");
                        Ok(v)
                    });
                    assert_eq!(v % 2, 0);
                }
            })
        })
        .collect();

    for h in writers {
        h.join().unwrap();
    }
    done.store(true, Ordering::Relaxed);
    for h in readers {
        h.join().unwrap();
    }

    assert_eq!(stm.atomically(|tx| tx.read(&var)), 2000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_bank_transfer() {
    let stm = Arc::new(Stm::new());
    let num_accounts = 10;
    let accounts: Vec<_> = (0..num_accounts).map(|_| stm.tvar(1000i64)).collect();

    let threads = 4;
    let transfers = 200;

    let mut handles = vec![];
    for t in 0..threads {
        let stm = stm.clone();
        let accounts = accounts.clone();
        handles.push(thread::spawn(move || {
            for i in 0..transfers {
                let from = (t * 5 + i) % num_accounts;
                let to = (t * 5 + i + 1) % num_accounts;
                let amount = 1;

                stm.atomically(|tx| {
                    let from_bal = tx.read(&accounts[from])?;
                    let to_bal = tx.read(&accounts[to])?;
                    if from_bal >= amount {
                        tx.write(&accounts[from], from_bal - amount)?;
                        tx.write(&accounts[to], to_bal + amount)?;
                    }
                    Ok(())
                });
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // Total money should be conserved
    let total: i64 = stm.atomically(|tx| {
        let mut sum = 0;
        for acc in &accounts {
            sum += tx.read(acc)?;
        }
        Ok(sum)
    });

    assert_eq!(
        total,
        num_accounts as i64 * 1000,
        "money not conserved: total = {}",
        total
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_multi_var_swap() {
    let stm = Arc::new(Stm::new());
    let a = stm.tvar(1i64);
    let b = stm.tvar(2i64);

    let threads = 4;
    let swaps = 100;

    let mut handles = vec![];
    for _ in 0..threads {
        let stm = stm.clone();
        let a = a.clone();
        let b = b.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..swaps {
                stm.atomically(|tx| {
                    let va = tx.read(&a)?;
                    let vb = tx.read(&b)?;
                    tx.write(&a, vb)?;
                    tx.write(&b, va)?;
                    Ok(())
                });
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    let (va, vb) = stm.atomically(|tx| Ok((tx.read(&a)?, tx.read(&b)?)));
    assert!(
        (va == 1 && vb == 2) || (va == 2 && vb == 1),
        "unexpected: a={}, b={}",
        va,
        vb
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_two_contenders_make_progress() {
    let stm = Arc::new(Stm::new());
    let var = stm.tvar(0u32);
    let rounds = 1_000;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let stm = stm.clone();
            let var = var.clone();
            thread::spawn(move || {
                for _ in 0..rounds {
                    stm.atomically(|tx| tx.modify(&var, |v| v + 1));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(stm.atomically(|tx| tx.read(&var)), 2 * rounds);
    let stats = stm.stats();
    assert_eq!(stats.commits, 2 * rounds as u64 + 1);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_large_values_reclaimed_under_churn() {
    let stm = Arc::new(Stm::new());
    let var = stm.tvar(vec![0u8; 1024]);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let stm = stm.clone();
            let var = var.clone();
            thread::spawn(move || {
                for j in 0..500 {
                    let byte = (i * 31 + j) as u8;
                    stm.atomically(|tx| tx.write(&var, vec![byte; 1024]));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let v = stm.atomically(|tx| tx.read(&var));
    assert_eq!(v.len(), 1024);
    assert!(v.iter().all(|b| *b == v[0]));
}
