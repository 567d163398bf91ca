use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc, Mutex, OnceLock, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{AuditError, AuditResult},
    event::Event,
    generator::CandidateGenerator,
    params::{AttackMethod, AttackParams, TargetSpec},
    PROGRESS_CAP,
};

/// The identifier of a session inside a registry.
pub type SessionId = u64;

/// The status of a session.
/// A session goes from `Pending` to `Running` when it is started, then ends exactly once
/// in one of the terminal statuses.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending = 0,
    Running = 1,
    /// A candidate matched the target.
    Completed = 2,
    /// The candidates were exhausted, or the word source could not be read.
    Failed = 3,
    /// The session was stopped from the outside.
    Stopped = 4,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    fn from_u8(status: u8) -> Self {
        match status {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Stopped,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };

        f.write_str(name)
    }
}

/// The state shared between a session and its worker.
/// Only the status can be written by both sides, everything else is written by the worker.
struct SessionState {
    id: SessionId,
    status: AtomicU8,
    attempts: AtomicU64,
    total: AtomicU64,
    started_at: OnceLock<Instant>,
    finished_at: OnceLock<Instant>,
    result: OnceLock<String>,
    message: OnceLock<String>,
    events: Option<Sender<Event>>,
}

impl SessionState {
    fn new(id: SessionId, events: Option<Sender<Event>>) -> Self {
        Self {
            id,
            status: AtomicU8::new(Status::Pending as u8),
            attempts: AtomicU64::new(0),
            total: AtomicU64::new(0),
            started_at: OnceLock::new(),
            finished_at: OnceLock::new(),
            result: OnceLock::new(),
            message: OnceLock::new(),
            events,
        }
    }

    fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Moves the session from one status to another.
    /// Returns false if the session was not in the `from` status anymore.
    fn transition(&self, from: Status, to: Status) -> bool {
        let moved = self
            .status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if moved && to.is_terminal() {
            let _ = self.finished_at.set(Instant::now());
        }

        moved
    }

    /// Moves the session to a terminal status and notifies the registry.
    fn finish(&self, from: Status, to: Status) -> bool {
        if !self.transition(from, to) {
            return false;
        }

        info!(
            "Session {} {to} after {} attempts",
            self.id,
            self.attempts()
        );
        self.send(Event::Finished {
            id: self.id,
            status: to,
        });

        true
    }

    /// Marks the session as failed with a message.
    fn fail(&self, from: Status, message: String) {
        warn!("Session {}: {message}", self.id);
        let _ = self.message.set(message);
        self.finish(from, Status::Failed);
    }

    /// Sends an event without ever blocking the session.
    /// Nobody listening is not an error, and a full channel drops the event.
    fn send(&self, event: Event) {
        let Some(events) = &self.events else {
            return;
        };

        if let Err(TrySendError::Full(event)) = events.try_send(event) {
            debug!("Dropped {event:?}, the event channel is full");
        }
    }
}

/// A point-in-time view of a session, all that a front-end needs to render it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: SessionId,
    pub target_hash: String,
    pub method: AttackMethod,
    pub status: Status,
    /// Progress in percent, capped to 95 while running and exactly 100 once finished.
    pub progress: f64,
    pub attempts: u64,
    /// Candidates tried per second.
    pub rate: f64,
    /// The matching plaintext, only set when the session completed.
    pub result: Option<String>,
    /// Why the session failed, only set when the session failed.
    pub message: Option<String>,
}

/// One attack of one target with one set of parameters.
pub struct AttackSession {
    target: TargetSpec,
    params: AttackParams,
    state: Arc<SessionState>,
    started: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AttackSession {
    /// Creates a new pending session.
    /// Fails if the parameters are invalid, in which case the session never exists.
    pub fn new(id: SessionId, target: TargetSpec, params: AttackParams) -> AuditResult<Self> {
        Self::new_impl(id, target, params, None)
    }

    /// Creates a new pending session that reports its lifecycle to the given channel.
    pub fn new_with_events(
        id: SessionId,
        target: TargetSpec,
        params: AttackParams,
        events: Sender<Event>,
    ) -> AuditResult<Self> {
        Self::new_impl(id, target, params, Some(events))
    }

    fn new_impl(
        id: SessionId,
        target: TargetSpec,
        params: AttackParams,
        events: Option<Sender<Event>>,
    ) -> AuditResult<Self> {
        params.validate()?;

        Ok(Self {
            target,
            params,
            state: Arc::new(SessionState::new(id, events)),
            started: AtomicBool::new(false),
            worker: Mutex::new(None),
        })
    }

    pub fn id(&self) -> SessionId {
        self.state.id
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn params(&self) -> &AttackParams {
        &self.params
    }

    pub fn method(&self) -> AttackMethod {
        self.params.method()
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Returns true if the session was started and is not finished yet.
    pub fn is_active(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.status().is_terminal()
    }

    /// Returns the number of candidates tested so far.
    pub fn attempts(&self) -> u64 {
        self.state.attempts()
    }

    /// Returns the number of candidates of the attack, known once the session is running.
    pub fn total(&self) -> u64 {
        self.state.total.load(Ordering::Relaxed)
    }

    /// Returns the time spent running, frozen once the session is finished.
    pub fn elapsed(&self) -> Duration {
        let Some(started_at) = self.state.started_at.get() else {
            return Duration::ZERO;
        };

        self.state
            .finished_at
            .get()
            .copied()
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(*started_at)
    }

    /// Returns the number of candidates tested per second.
    pub fn rate(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();

        if elapsed > 0. {
            self.attempts() as f64 / elapsed
        } else {
            0.
        }
    }

    /// Returns the progress of the attack in percent.
    pub fn progress(&self) -> f64 {
        progress(self.status(), self.attempts(), self.total())
    }

    /// Returns the plaintext matching the target, if the session completed.
    pub fn result(&self) -> Option<String> {
        match self.status() {
            Status::Completed => self.state.result.get().cloned(),
            _ => None,
        }
    }

    /// Returns why the session failed, if it failed.
    pub fn message(&self) -> Option<String> {
        match self.status() {
            Status::Failed => self.state.message.get().cloned(),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let attempts = self.attempts();
        let status = self.status();

        Snapshot {
            id: self.id(),
            target_hash: self.target.hash_value().to_owned(),
            method: self.method(),
            status,
            progress: progress(status, attempts, self.total()),
            attempts,
            rate: self.rate(),
            result: self.result(),
            message: self.message(),
        }
    }

    /// Starts the attack in its own thread.
    /// The word source is opened by the worker, so this returns immediately.
    pub fn start(&self) -> AuditResult<()> {
        if self.started.swap(true, Ordering::AcqRel) || self.status() != Status::Pending {
            return Err(AuditError::AlreadyStarted(self.id()));
        }

        let state = self.state.clone();
        let target = self.target.clone();
        let params = self.params.clone();

        let handle = thread::Builder::new()
            .name(format!("session-{}", self.id()))
            .spawn(move || {
                run(&state, &target, params.method(), || {
                    CandidateGenerator::open(&params)
                })
            })?;

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(())
    }

    /// Requests the session to stop.
    /// The worker notices the request before testing its next candidate.
    /// Returns false if the session was already finished.
    pub fn stop(&self) -> bool {
        let mut current = self.status();

        while !current.is_terminal() {
            if self.state.finish(current, Status::Stopped) {
                return true;
            }
            current = self.status();
        }

        false
    }

    /// Blocks until the worker of the session is finished and returns the final status.
    /// Returns the current status right away if the session was never started.
    pub fn wait(&self) -> Status {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                let current = self.status();
                if !current.is_terminal() {
                    self.state
                        .fail(current, "The attack worker panicked".to_owned());
                }
            }
        }

        self.status()
    }
}

impl Drop for AttackSession {
    fn drop(&mut self) {
        // a dropped session must not leave its worker hashing forever
        if self.started.load(Ordering::Acquire) {
            self.stop();
        }
    }
}

fn progress(status: Status, attempts: u64, total: u64) -> f64 {
    if status.is_terminal() {
        100.
    } else if total == 0 {
        0.
    } else {
        (attempts as f64 / total as f64 * 100.).min(PROGRESS_CAP)
    }
}

/// The body of the worker of a session.
/// The candidates are opened by `open`, while the session is still pending.
fn run(
    state: &SessionState,
    target: &TargetSpec,
    method: AttackMethod,
    open: impl FnOnce() -> AuditResult<CandidateGenerator>,
) {
    let mut generator = match open() {
        Ok(generator) => generator,
        Err(err) => {
            state.fail(Status::Pending, err.to_string());
            return;
        }
    };

    let total = generator.total();
    state.total.store(total, Ordering::Relaxed);
    let _ = state.started_at.set(Instant::now());

    if !state.transition(Status::Pending, Status::Running) {
        debug!("Session {} was stopped before running", state.id);
        return;
    }

    info!(
        "Session {} running a {method} attack over {total} candidates",
        state.id
    );
    state.send(Event::Started {
        id: state.id,
        total,
    });

    let oracle = target.oracle();

    loop {
        // cancellation is only observed here, between two candidates
        if state.status() != Status::Running {
            debug!("Session {} noticed it was stopped", state.id);
            return;
        }

        let candidate = match generator.next() {
            Some(Ok(candidate)) => candidate,
            Some(Err(err)) => {
                state.fail(Status::Running, err.to_string());
                return;
            }
            None => {
                state.fail(
                    Status::Running,
                    format!("Exhausted the {total} candidates without a match"),
                );
                return;
            }
        };

        state.attempts.fetch_add(1, Ordering::Relaxed);

        if oracle.matches_digest(&candidate, target.digest()) {
            let _ = state.result.set(candidate);
            state.finish(Status::Running, Status::Completed);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        thread,
        time::{Duration, Instant},
    };

    use crossbeam_channel::{bounded, unbounded};

    use crate::{
        error::AuditError,
        event::Event,
        generator::CandidateGenerator,
        hash::{HashFunction, HashOracle},
        params::{AttackMethod, AttackParams, TargetSpec},
        session::{run, AttackSession, SessionState, Status},
        wordlist::unplugged_source,
    };

    fn target(plaintext: &str, hash_function: HashFunction) -> TargetSpec {
        let digest = HashOracle::new(hash_function).digest(plaintext);
        TargetSpec::new(&digest, hash_function).unwrap()
    }

    fn huge_brute_force() -> AttackParams {
        AttackParams::Brute {
            mask: "?a".to_owned(),
            min_len: 1,
            max_len: 8,
        }
    }

    /// Waits until the session tested at least one candidate.
    fn wait_for_attempts(session: &AttackSession) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.attempts() == 0 {
            assert!(Instant::now() < deadline, "the session never ran");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_brute_force_completes() {
        let params = AttackParams::Brute {
            mask: "?l".to_owned(),
            min_len: 1,
            max_len: 3,
        };
        let session = AttackSession::new(1, target("cat", HashFunction::Md5), params).unwrap();

        assert_eq!(Status::Pending, session.status());
        session.start().unwrap();

        assert_eq!(Status::Completed, session.wait());
        assert_eq!(Some("cat".to_owned()), session.result());
        // every 1 and 2 letters candidate, then "cat" is the 1372nd of length 3
        assert_eq!(26 + 26 * 26 + 2 * 26 * 26 + 19 + 1, session.attempts());
        assert_eq!(100., session.progress());
        assert_eq!(None, session.message());
    }

    #[test]
    fn test_dictionary_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();

        let session = AttackSession::new(
            1,
            target("nonexistent-zzz999", HashFunction::Md5),
            AttackParams::Dictionary { path },
        )
        .unwrap();
        session.start().unwrap();

        assert_eq!(Status::Failed, session.wait());
        assert_eq!(3, session.attempts());
        assert_eq!(3, session.total());
        assert_eq!(None, session.result());
        assert_eq!(100., session.progress());
        assert!(session.message().is_some());
    }

    #[test]
    fn test_rule_attack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "dragon\nPassword\nmonkey\n").unwrap();

        let session = AttackSession::new(
            1,
            target("P@ssword", HashFunction::Sha1),
            AttackParams::Rule { path },
        )
        .unwrap();
        session.start().unwrap();

        assert_eq!(Status::Completed, session.wait());
        assert_eq!(Some("P@ssword".to_owned()), session.result());
        assert!(session.attempts() < session.total());
    }

    #[test]
    fn test_mask_attack() {
        let session = AttackSession::new(
            1,
            target("Ab7!", HashFunction::Sha256),
            AttackParams::MaskAttack {
                mask: "?ub?d!".to_owned(),
            },
        )
        .unwrap();
        session.start().unwrap();

        assert_eq!(Status::Completed, session.wait());
        assert_eq!(Some("Ab7!".to_owned()), session.result());
        assert_eq!(260, session.total());
    }

    #[test]
    fn test_stop_running_session() {
        let session =
            AttackSession::new(1, target("not in there", HashFunction::Md5), huge_brute_force())
                .unwrap();
        session.start().unwrap();
        wait_for_attempts(&session);

        assert!(session.stop());
        assert_eq!(Status::Stopped, session.wait());

        let attempts = session.attempts();
        assert!(attempts >= 1 && attempts < session.total());
        assert_eq!(None, session.result());
        assert_eq!(100., session.progress());

        // the terminal status never changes afterwards
        assert!(!session.stop());
        assert_eq!(attempts, session.attempts());
    }

    #[test]
    fn test_progress_while_running() {
        let session =
            AttackSession::new(1, target("not in there", HashFunction::Md5), huge_brute_force())
                .unwrap();

        assert_eq!(0., session.progress());
        assert_eq!(0., session.rate());

        session.start().unwrap();
        wait_for_attempts(&session);

        for _ in 0..10 {
            let snapshot = session.snapshot();
            if snapshot.status == Status::Running {
                assert!(snapshot.progress <= 95.);
                assert!(snapshot.rate >= 0.);
            }
            thread::sleep(Duration::from_millis(1));
        }

        session.stop();
        session.wait();
        assert_eq!(100., session.snapshot().progress);
        assert!(session.rate() >= 0.);
    }

    #[test]
    fn test_unreadable_word_source() {
        let session = AttackSession::new(
            1,
            target("word", HashFunction::Md5),
            AttackParams::Dictionary {
                path: PathBuf::from("/nonexistent/words.txt"),
            },
        )
        .unwrap();
        session.start().unwrap();

        assert_eq!(Status::Failed, session.wait());
        assert_eq!(0, session.attempts());
        assert_eq!(0., session.rate());
        assert!(session.message().unwrap().contains("/nonexistent/words.txt"));
    }

    #[test]
    fn test_invalid_params() {
        let params = AttackParams::Brute {
            mask: "?d".to_owned(),
            min_len: 3,
            max_len: 1,
        };

        assert!(matches!(
            AttackSession::new(1, target("1", HashFunction::Md5), params),
            Err(AuditError::LengthRange { .. })
        ));
    }

    #[test]
    fn test_lifecycle_errors() {
        let params = AttackParams::MaskAttack {
            mask: "?d".to_owned(),
        };

        let session = AttackSession::new(1, target("5", HashFunction::Md5), params.clone()).unwrap();
        session.start().unwrap();
        assert!(matches!(session.start(), Err(AuditError::AlreadyStarted(1))));
        session.wait();

        // a pending session can be stopped, and can't be started afterwards
        let pending = AttackSession::new(2, target("5", HashFunction::Md5), params).unwrap();
        assert!(pending.stop());
        assert_eq!(Status::Stopped, pending.wait());
        assert_eq!(0, pending.attempts());
        assert!(pending.start().is_err());
    }

    #[test]
    fn test_events() {
        let (sender, receiver) = unbounded();
        let session = AttackSession::new_with_events(
            7,
            target("42", HashFunction::Ntlm),
            AttackParams::MaskAttack {
                mask: "?d?d".to_owned(),
            },
            sender,
        )
        .unwrap();
        session.start().unwrap();
        session.wait();

        let events = receiver.try_iter().collect::<Vec<_>>();
        assert_eq!(
            vec![
                Event::Started { id: 7, total: 100 },
                Event::Finished {
                    id: 7,
                    status: Status::Completed
                },
            ],
            events
        );
    }

    #[test]
    fn test_word_source_lost_mid_attack() {
        let (sender, receiver) = unbounded();
        let state = SessionState::new(3, Some(sender));
        let source = unplugged_source("alpha\nbeta\ngamma\n");

        run(
            &state,
            &target("not in there", HashFunction::Md5),
            AttackMethod::Dict,
            || Ok(CandidateGenerator::from_words(source, 3)),
        );

        assert_eq!(Status::Failed, state.status());
        // the words read before the failure were all tested
        assert_eq!(3, state.attempts());
        assert_eq!(None, state.result.get());
        assert_eq!(
            Some("The word source became unreadable during the attack"),
            state.message.get().map(String::as_str)
        );
        assert!(state.finished_at.get().is_some());
        assert_eq!(
            vec![
                Event::Started { id: 3, total: 3 },
                Event::Finished {
                    id: 3,
                    status: Status::Failed
                },
            ],
            receiver.try_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_match_before_word_source_is_lost() {
        let state = SessionState::new(1, None);
        let source = unplugged_source("alpha\nbeta\n");

        run(
            &state,
            &target("bet@", HashFunction::Sha1),
            AttackMethod::Rule,
            || Ok(CandidateGenerator::from_ruled_words(source, 0)),
        );

        assert_eq!(Status::Completed, state.status());
        assert_eq!(Some("bet@"), state.result.get().map(String::as_str));
        assert_eq!(None, state.message.get());
    }

    #[test]
    fn test_full_event_channel() {
        let (sender, receiver) = bounded(1);
        let session = AttackSession::new_with_events(
            1,
            target("5", HashFunction::Md5),
            AttackParams::MaskAttack {
                mask: "?d".to_owned(),
            },
            sender,
        )
        .unwrap();
        session.start().unwrap();

        // the session never blocks on a listener that does not drain its events
        assert_eq!(Status::Completed, session.wait());
        assert_eq!(
            vec![Event::Started { id: 1, total: 10 }],
            receiver.try_iter().collect::<Vec<_>>()
        );
    }
}
