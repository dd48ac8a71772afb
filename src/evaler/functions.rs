//! The impls and functions.
//!
use std::{fs, path::PathBuf, sync::{Arc, atomic::{AtomicBool, Ordering}, mpsc::{channel, RecvTimeoutError}}, time::{Duration, Instant}};
use chrono::{DateTime, Local};
use serde_json::Value;
use anyhow::{bail, Context};
use log::*;
use crate::error::{ReplicasetError, Result};
use crate::evaler::{EvalOptions, EvalTarget, Evaler, ReplayEvaler, TargetResult};

pub const DEFAULT_PARALLEL: usize = 1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
// how often the cancel flag is looked at while waiting for replies
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
// deadlines further out than this are cut to it
const MAX_DEADLINE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

enum Progress {
    Started(usize, Instant),
    Finished(usize, DateTime<Local>, anyhow::Result<Vec<Value>>),
}

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start.checked_add(timeout.min(MAX_DEADLINE))
        .or_else(|| start.checked_add(MAX_DEADLINE))
        .unwrap_or(start)
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            parallel: DEFAULT_PARALLEL,
            timeout: DEFAULT_TIMEOUT,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl EvalTarget {
    pub fn new(
        name: impl Into<String>,
        evaler: Arc<dyn Evaler>,
    ) -> Self
    {
        EvalTarget {
            name: name.into(),
            evaler,
        }
    }
}

impl ReplayEvaler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReplayEvaler { path: path.into() }
    }
}

impl Evaler for ReplayEvaler {
    fn eval(&self, query: &str, _args: &[Value]) -> anyhow::Result<Vec<Value>> {
        trace!("replay {} for query of {} bytes", self.path.display(), query.len());
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Error reading file: {}", self.path.display()))?;
        let reply: Value = serde_json::from_str(&data)
            .with_context(|| format!("Error parsing JSON in file: {}", self.path.display()))?;
        match reply {
            Value::Array(values) => Ok(values),
            // a nil reply
            Value::Null => Ok(Vec::new()),
            other => bail!("file {} must contain a JSON array, found: {}", self.path.display(), other),
        }
    }
}

/// Evaluates `query` on every target and returns one result per target, in target order.
///
/// Calls run on a pool of at most `options.parallel` threads. A call that does not finish
/// within `options.timeout` after it started becomes a [ReplicasetError::Timeout] for that
/// target; a call still queued when every started call had its chance is bounded by
/// `timeout` times the number of waves the pool needs. Late replies are dropped.
///
/// The only failures of the whole evaluation are a thread pool that cannot be created and a
/// raised cancel flag.
pub fn eval_targets(
    query: &str,
    args: &[Value],
    targets: &[EvalTarget],
    options: &EvalOptions,
) -> Result<Vec<TargetResult>>
{
    if targets.is_empty() {
        return Ok(Vec::new());
    }
    info!("begin parallel eval");
    let timer = Instant::now();

    let threads = options.parallel.clamp(1, targets.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("eval-{}", index))
        .panic_handler(|_| error!("an evaler panicked, its target will time out"))
        .build()
        .map_err(|e| ReplicasetError::Boundary(anyhow::Error::new(e).context("Cannot create the eval thread pool")))?;

    let (tx, rx) = channel();
    let query: Arc<str> = Arc::from(query);
    let args: Arc<[Value]> = Arc::from(args.to_vec());
    for (index, target) in targets.iter().enumerate() {
        let tx = tx.clone();
        let evaler = Arc::clone(&target.evaler);
        let query = Arc::clone(&query);
        let args = Arc::clone(&args);
        let cancel = Arc::clone(&options.cancel);
        pool.spawn(move || {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            // a failed send means the evaluation already gave up on this call
            if tx.send(Progress::Started(index, Instant::now())).is_err() {
                return;
            }
            let result = evaler.eval(&query, &args);
            let _ = tx.send(Progress::Finished(index, Local::now(), result));
        });
    }
    drop(tx);

    let total = targets.len();
    let waves = (total + threads - 1) / threads;
    let wave_count = u32::try_from(waves).unwrap_or(u32::MAX);
    let overall_deadline = deadline_after(Instant::now(), options.timeout.checked_mul(wave_count).unwrap_or(MAX_DEADLINE));
    let mut started: Vec<Option<Instant>> = vec![None; total];
    let mut results: Vec<Option<(DateTime<Local>, Result<Vec<Value>>)>> = (0..total).map(|_| None).collect();
    let mut pending = total;

    while pending > 0 {
        if options.cancel.load(Ordering::Relaxed) {
            warn!("parallel eval cancelled, abandoning {} of {} calls", pending, total);
            return Err(ReplicasetError::Cancelled);
        }
        let now = Instant::now();
        for index in 0..total {
            if results[index].is_some() {
                continue;
            }
            if let Some(start) = started[index] {
                if now >= deadline_after(start, options.timeout) {
                    warn!("{}: no reply within {:?}", targets[index].name, options.timeout);
                    results[index] = Some((Local::now(), Err(ReplicasetError::Timeout(options.timeout))));
                    pending -= 1;
                }
            }
        }
        if pending == 0 || now >= overall_deadline {
            break;
        }
        let next_deadline = started.iter()
            .zip(results.iter())
            .filter_map(|(start, result)| match (start, result) {
                (Some(start), None) => Some(deadline_after(*start, options.timeout)),
                _ => None,
            })
            .min()
            .unwrap_or(overall_deadline)
            .min(overall_deadline);
        let wait = next_deadline.saturating_duration_since(now).min(CANCEL_POLL_INTERVAL);

        match rx.recv_timeout(wait) {
            Ok(Progress::Started(index, at)) => started[index] = Some(at),
            Ok(Progress::Finished(index, timestamp, result)) => {
                if results[index].is_none() {
                    debug!("{}: reply received", targets[index].name);
                    results[index] = Some((timestamp, result.map_err(ReplicasetError::Boundary)));
                    pending -= 1;
                } else {
                    debug!("{}: discarding late reply", targets[index].name);
                }
            },
            Err(RecvTimeoutError::Timeout) => {},
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("end parallel eval {:?}", timer.elapsed());

    Ok(targets.iter()
        .zip(results)
        .map(|(target, result)| {
            let (timestamp, result) = result.unwrap_or_else(|| {
                warn!("{}: call did not complete within {:?}", target.name, options.timeout);
                (Local::now(), Err(ReplicasetError::Timeout(options.timeout)))
            });
            TargetResult {
                target: target.name.clone(),
                timestamp,
                result,
            }
        })
        .collect())
}
