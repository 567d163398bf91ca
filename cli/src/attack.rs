use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crackaudit_core::{
    AttackMethod, AttackRequest, Event, HashFunction, SessionRegistry, Snapshot, Status,
};
use crossbeam_channel::RecvTimeoutError;
use human_repr::{HumanCount, HumanDuration, HumanThroughput};
use tracing::info;

use crate::Attack;

/// How often the progress line is refreshed.
const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

pub fn attack(atk: Attack) -> Result<()> {
    let method = AttackMethod::from(atk.method);
    let hash_function = HashFunction::from(atk.hash_function);

    let request = AttackRequest {
        target_hash: atk.digest,
        hash_type: Some(hash_function.to_string()),
        method: method.to_string(),
        wordlist: Some(atk.wordlist),
        charset: Some(atk.charset),
        min_length: Some(atk.min_length),
        max_length: Some(atk.max_length),
    };

    let registry = SessionRegistry::new();
    let events = registry.events();
    let id = registry
        .create_from_request(request)
        .context("Invalid attack parameters")?;
    registry.start(id)?;

    let session = registry.get(id)?;
    let deadline = atk.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let show_progress = !atk.json;

    loop {
        if show_progress {
            print_progress(&registry.snapshot(id)?, session.elapsed())?;
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) && registry.stop(id)? {
            info!("Timeout reached, stopping the attack");
        }

        match events.recv_timeout(REFRESH_INTERVAL) {
            Ok(Event::Finished { .. }) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Event::Started { total, .. }) => info!("Trying {total} candidates"),
            Err(RecvTimeoutError::Timeout) => (),
        }
    }

    registry.wait(id)?;
    let snapshot = registry.snapshot(id)?;

    if atk.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_progress(&snapshot, session.elapsed())?;
    eprintln!();

    match snapshot.status {
        Status::Completed => {
            if let Some(password) = snapshot.result {
                println!("{password}");
            }
        }
        Status::Stopped => eprintln!("The attack was stopped before finding the password"),
        _ => eprintln!(
            "No password found for the given digest: {}",
            snapshot.message.as_deref().unwrap_or("unknown error")
        ),
    }

    Ok(())
}

/// Rewrites the progress line of the attack.
fn print_progress(snapshot: &Snapshot, elapsed: Duration) -> Result<()> {
    let mut stderr = io::stderr().lock();

    write!(
        stderr,
        "\r[{}] {:>5.1}% {} candidates, {} in {}    ",
        snapshot.status,
        snapshot.progress,
        snapshot.attempts.human_count_bare(),
        snapshot.rate.human_throughput("H"),
        elapsed.as_secs_f64().human_duration(),
    )?;
    stderr.flush()?;

    Ok(())
}
