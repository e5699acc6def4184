//! Load the store-detection engine, let it run, then unload it.
//!
//! # Environment Variables
//!
//! - `MW_RUN_SECS=5` - How long to run before unloading
//! - `MW_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `MW_FLUSH_EPRINT=1` - Flush debug output immediately
//! - `MW_MONITOR_CPU`, `MW_WORKER_CPU`, `MW_POLL_INTERVAL_MS`, ... - see `EngineConfig`

use std::time::Duration;

use mwait::{env_get, kerror, kinfo, Engine, EngineConfig};

// MW_LOG_LEVEL=info MW_WRITE_MASK=0x3 cargo run -p mwatch
fn main() {
    mwait::init_logging();

    let config = EngineConfig::from_env();
    config.print();

    let engine = match Engine::load(config) {
        Ok(engine) => engine,
        Err(e) => {
            kerror!("Load failed: {}", e);
            std::process::exit(1);
        }
    };

    let run_for = Duration::from_secs(env_get("MW_RUN_SECS", 5u64));
    kinfo!("Watching {:#x} for {:?}", engine.address(), run_for);
    std::thread::sleep(run_for);

    let reports = engine.reports();
    let dropped = engine.dropped_reports();
    let summary = engine.unload();

    println!("\n=== {} store(s) detected ===", reports.len());
    for report in &reports {
        println!("{}", report);
    }
    if dropped > 0 {
        println!("({} report(s) dropped)", dropped);
    }

    println!("\nfinal value:    {:#x}", summary.final_value);
    println!("worker joined:  {}", summary.worker_joined);
    if let Some(worker) = summary.worker {
        println!(
            "worker:         {} iterations, {} writes, monitor joined: {}",
            worker.iterations, worker.writes, worker.monitor_joined
        );
    }
    if let Some(monitor) = summary.monitor {
        println!(
            "monitor:        {} wakeups, {} stores, {} spurious",
            monitor.wakeups, monitor.stores_detected, monitor.spurious_wakeups
        );
    }
}
