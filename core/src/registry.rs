use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info};

use crate::{
    error::{AuditError, AuditResult},
    event::Event,
    params::{AttackParams, AttackRequest, TargetSpec},
    session::{AttackSession, SessionId, Snapshot, Status},
};

/// The number of events kept for the receivers of a registry.
/// Sessions drop their events while the channel is full.
pub const EVENT_CAPACITY: usize = 1024;

/// Owns the sessions and gives access to them by id.
/// This is the surface a front-end drives: it creates and starts sessions, polls their
/// snapshots and stops them.
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, Arc<AttackSession>>>,
    next_id: AtomicU64,
    max_active: Option<usize>,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Creates a registry with no limit on the number of active sessions.
    pub fn new() -> Self {
        let (sender, receiver) = bounded(EVENT_CAPACITY);

        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            max_active: None,
            sender,
            receiver,
        }
    }

    /// Creates a registry running at most `max_active` sessions at the same time.
    pub fn with_max_active(max_active: usize) -> Self {
        Self {
            max_active: Some(max_active),
            ..Self::new()
        }
    }

    /// Returns a receiver of the lifecycle events of all the sessions of the registry.
    /// Events are shared between the receivers, each event is received only once.
    /// At most [`EVENT_CAPACITY`] events wait for a receiver, later ones are dropped.
    pub fn events(&self) -> Receiver<Event> {
        self.receiver.clone()
    }

    /// Creates a new pending session and returns its id.
    pub fn create(&self, target: TargetSpec, params: AttackParams) -> AuditResult<SessionId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = AttackSession::new_with_events(id, target, params, self.sender.clone())?;

        debug!("Created session {id} ({} attack)", session.method());
        self.write().insert(id, Arc::new(session));

        Ok(id)
    }

    /// Creates a new pending session from a front-end request.
    pub fn create_from_request(&self, request: AttackRequest) -> AuditResult<SessionId> {
        let (target, params) = request.into_parts()?;
        self.create(target, params)
    }

    /// Starts a pending session.
    pub fn start(&self, id: SessionId) -> AuditResult<()> {
        // the write lock keeps the active count stable until the session is started
        let sessions = self.write();
        let session = sessions.get(&id).ok_or(AuditError::SessionNotFound(id))?;

        if let Some(max_active) = self.max_active {
            let active = sessions.values().filter(|session| session.is_active()).count();
            if active >= max_active {
                return Err(AuditError::TooManySessions(max_active));
            }
        }

        session.start()
    }

    /// Creates a session and starts it right away.
    /// The session is discarded if it cannot be started.
    pub fn create_and_start(
        &self,
        target: TargetSpec,
        params: AttackParams,
    ) -> AuditResult<SessionId> {
        let id = self.create(target, params)?;

        if let Err(err) = self.start(id) {
            self.write().remove(&id);
            return Err(err);
        }

        Ok(id)
    }

    /// Requests a session to stop.
    /// Returns false if the session was already finished.
    pub fn stop(&self, id: SessionId) -> AuditResult<bool> {
        let stopped = self.get(id)?.stop();
        if stopped {
            info!("Stop requested for session {id}");
        }

        Ok(stopped)
    }

    /// Returns the session with the given id.
    pub fn get(&self, id: SessionId) -> AuditResult<Arc<AttackSession>> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(AuditError::SessionNotFound(id))
    }

    pub fn snapshot(&self, id: SessionId) -> AuditResult<Snapshot> {
        self.read()
            .get(&id)
            .map(|session| session.snapshot())
            .ok_or(AuditError::SessionNotFound(id))
    }

    /// Returns the snapshots of all the sessions, sorted by id.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.read()
            .values()
            .map(|session| session.snapshot())
            .collect()
    }

    /// Blocks until the session is finished and returns its final status.
    pub fn wait(&self, id: SessionId) -> AuditResult<Status> {
        // don't hold the lock while waiting
        let session = self.get(id)?;
        Ok(session.wait())
    }

    /// Removes a finished session from the registry and returns its last snapshot.
    pub fn remove(&self, id: SessionId) -> AuditResult<Snapshot> {
        let mut sessions = self.write();
        let session = sessions.get(&id).ok_or(AuditError::SessionNotFound(id))?;

        if !session.status().is_terminal() {
            return Err(AuditError::SessionActive(id));
        }

        let snapshot = session.snapshot();
        sessions.remove(&id);

        Ok(snapshot)
    }

    /// Returns the number of sessions in the registry.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<SessionId, Arc<AttackSession>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<SessionId, Arc<AttackSession>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use itertools::Itertools;

    use crate::{
        error::AuditError,
        event::Event,
        hash::{HashFunction, HashOracle},
        params::{AttackMethod, AttackParams, AttackRequest, TargetSpec},
        registry::{SessionRegistry, EVENT_CAPACITY},
        session::Status,
    };

    fn md5_target(plaintext: &str) -> TargetSpec {
        TargetSpec::new(&HashOracle::new(HashFunction::Md5).digest(plaintext), HashFunction::Md5)
            .unwrap()
    }

    fn huge_brute_force() -> AttackParams {
        AttackParams::Brute {
            mask: "?a".to_owned(),
            min_len: 1,
            max_len: 8,
        }
    }

    fn small_mask() -> AttackParams {
        AttackParams::MaskAttack {
            mask: "?d?d".to_owned(),
        }
    }

    #[test]
    fn test_create_and_poll() {
        let registry = SessionRegistry::new();
        let first = registry.create(md5_target("12"), small_mask()).unwrap();
        let second = registry.create(md5_target("34"), small_mask()).unwrap();

        assert!(second > first);
        assert_eq!(2, registry.len());

        let snapshot = registry.snapshot(first).unwrap();
        assert_eq!(Status::Pending, snapshot.status);
        assert_eq!(AttackMethod::Mask, snapshot.method);
        assert_eq!(0, snapshot.attempts);
        assert_eq!(0., snapshot.progress);

        registry.start(second).unwrap();
        assert_eq!(Status::Completed, registry.wait(second).unwrap());

        let snapshots = registry.snapshots();
        assert_eq!(vec![first, second], snapshots.iter().map(|s| s.id).collect_vec());
        assert_eq!(Some("34".to_owned()), snapshots[1].result.clone());
        assert_eq!(35, snapshots[1].attempts);
    }

    #[test]
    fn test_unknown_session() {
        let registry = SessionRegistry::new();

        assert!(matches!(registry.start(42), Err(AuditError::SessionNotFound(42))));
        assert!(matches!(registry.stop(42), Err(AuditError::SessionNotFound(42))));
        assert!(matches!(registry.snapshot(42), Err(AuditError::SessionNotFound(42))));
        assert!(matches!(registry.remove(42), Err(AuditError::SessionNotFound(42))));
    }

    #[test]
    fn test_create_from_request() {
        let registry = SessionRegistry::new();
        let request = AttackRequest {
            target_hash: HashOracle::new(HashFunction::Sha1).digest("a1"),
            hash_type: Some("SHA1".to_owned()),
            method: "brute".to_owned(),
            max_length: Some(2),
            ..Default::default()
        };

        let id = registry.create_from_request(request).unwrap();
        registry.start(id).unwrap();
        assert_eq!(Status::Completed, registry.wait(id).unwrap());
        assert_eq!(Some("a1".to_owned()), registry.snapshot(id).unwrap().result);

        let unknown = AttackRequest {
            target_hash: "00".to_owned(),
            method: "hybrid".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            registry.create_from_request(unknown),
            Err(AuditError::UnknownMethod(_))
        ));
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_stop_and_remove() {
        let registry = SessionRegistry::new();
        let id = registry
            .create_and_start(md5_target("not in there"), huge_brute_force())
            .unwrap();

        assert!(matches!(registry.remove(id), Err(AuditError::SessionActive(_))));

        let deadline = Instant::now() + Duration::from_secs(10);
        while registry.snapshot(id).unwrap().attempts == 0 {
            assert!(Instant::now() < deadline, "the session never ran");
            thread::sleep(Duration::from_millis(1));
        }

        assert!(registry.stop(id).unwrap());
        assert_eq!(Status::Stopped, registry.wait(id).unwrap());
        assert!(!registry.stop(id).unwrap());

        let snapshot = registry.remove(id).unwrap();
        assert_eq!(Status::Stopped, snapshot.status);
        assert!(snapshot.attempts >= 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_max_active() {
        let registry = SessionRegistry::with_max_active(1);
        let running = registry
            .create_and_start(md5_target("not in there"), huge_brute_force())
            .unwrap();

        assert!(matches!(
            registry.create_and_start(md5_target("07"), small_mask()),
            Err(AuditError::TooManySessions(1))
        ));
        // the session that could not start was discarded
        assert_eq!(1, registry.len());

        registry.stop(running).unwrap();
        registry.wait(running).unwrap();

        let id = registry.create_and_start(md5_target("07"), small_mask()).unwrap();
        assert_eq!(Status::Completed, registry.wait(id).unwrap());
    }

    #[test]
    fn test_events() {
        let registry = SessionRegistry::new();
        let events = registry.events();

        let found = registry.create_and_start(md5_target("99"), small_mask()).unwrap();
        registry.wait(found).unwrap();

        let pending = registry.create(md5_target("99"), small_mask()).unwrap();
        registry.stop(pending).unwrap();

        let events = events.try_iter().collect_vec();
        assert_eq!(
            vec![
                Event::Started {
                    id: found,
                    total: 100
                },
                Event::Finished {
                    id: found,
                    status: Status::Completed
                },
                Event::Finished {
                    id: pending,
                    status: Status::Stopped
                },
            ],
            events
        );
    }

    #[test]
    fn test_huge_request_is_rejected() {
        let registry = SessionRegistry::new();
        let request = AttackRequest {
            target_hash: HashOracle::new(HashFunction::Md5).digest("abc"),
            method: "brute".to_owned(),
            charset: Some("?l".to_owned()),
            max_length: Some(usize::MAX),
            ..Default::default()
        };

        assert!(matches!(
            registry.create_from_request(request),
            Err(AuditError::Space(_))
        ));
        assert!(registry.is_empty());

        // the registry keeps working afterwards
        let id = registry.create_and_start(md5_target("42"), small_mask()).unwrap();
        assert_eq!(Status::Completed, registry.wait(id).unwrap());
    }

    #[test]
    fn test_undrained_events_are_bounded() {
        let registry = SessionRegistry::new();

        for _ in 0..EVENT_CAPACITY + 10 {
            let id = registry.create(md5_target("1"), small_mask()).unwrap();
            registry.stop(id).unwrap();
            registry.remove(id).unwrap();
        }

        let events = registry.events();
        assert_eq!(EVENT_CAPACITY, events.len());
        // the oldest events are the ones kept
        assert_eq!(
            Some(Event::Finished {
                id: 1,
                status: Status::Stopped
            }),
            events.try_recv().ok()
        );
        assert_eq!(EVENT_CAPACITY - 1, events.try_iter().count());
    }
}
