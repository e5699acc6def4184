//! Scripted capabilities for exercising the engine without hardware

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use mwait_core::{
    AliasHandle, CellWriter, DeviceError, DeviceHandle, DeviceHost, EngineResult,
    MonitorDescriptor, MutationSource, Placement, PlacementError, Role, SpawnError, ThreadHost,
    ThreadIdentity, WaitCapability,
};

use crate::device::FsDeviceHost;
use crate::host::StdHost;

/// Guard for scripted waits, which nothing can interrupt
pub struct NoMask;

/// What a scripted wakeup does to the cell before returning
#[derive(Debug, Clone)]
pub enum Step {
    Store(u64),
    /// Several stores between two samples
    StoreMany(Vec<u64>),
    Spurious,
}

/// Wait capability that plays a script instead of waiting.
///
/// Owns the writer, so monitor tests run single-threaded. An exhausted
/// script stores the sentinel.
pub struct ScriptedWait {
    writer: Mutex<Option<CellWriter>>,
    script: Mutex<VecDeque<Step>>,
    arms: AtomicUsize,
}

impl ScriptedWait {
    pub fn new(writer: CellWriter, script: Vec<Step>) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            script: Mutex::new(script.into()),
            arms: AtomicUsize::new(0),
        }
    }

    /// Script with no writer; every wakeup is spurious
    pub fn detached(script: Vec<Step>) -> Self {
        Self {
            writer: Mutex::new(None),
            script: Mutex::new(script.into()),
            arms: AtomicUsize::new(0),
        }
    }

    pub fn arms(&self) -> usize {
        self.arms.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl WaitCapability for ScriptedWait {
    type Guard = NoMask;

    fn suppress(&self) -> NoMask {
        NoMask
    }

    fn arm_and_wait(&self, _target: &MonitorDescriptor) {
        self.arms.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        let mut writer = self.writer.lock().unwrap();
        let Some(writer) = writer.as_mut() else {
            return;
        };
        match step {
            Some(Step::Store(v)) => writer.store(v),
            Some(Step::StoreMany(values)) => values.into_iter().for_each(|v| writer.store(v)),
            Some(Step::Spurious) => {}
            None => writer.store_sentinel(),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Mutation source that writes given values on given iterations (1-based)
pub struct ScriptedMutation {
    iteration: u64,
    writes: Vec<(u64, u64)>,
    every: Option<u64>,
}

impl ScriptedMutation {
    pub fn at(writes: Vec<(u64, u64)>) -> Self {
        Self {
            iteration: 0,
            writes,
            every: None,
        }
    }

    /// Propose `value` on every iteration
    pub fn every(value: u64) -> Self {
        Self {
            iteration: 0,
            writes: Vec::new(),
            every: Some(value),
        }
    }
}

impl MutationSource for ScriptedMutation {
    fn next(&mut self, _tick: u64) -> Option<u64> {
        self.iteration += 1;
        self.every.or_else(|| {
            self.writes
                .iter()
                .find(|(at, _)| *at == self.iteration)
                .map(|(_, v)| *v)
        })
    }
}

/// `StdHost` with injected spawn or join failures
pub struct FaultyHost {
    inner: StdHost,
    refuse: Option<&'static str>,
    joins: bool,
}

impl FaultyHost {
    /// Refuse to spawn threads named `name`
    pub fn refusing(name: &'static str) -> Self {
        Self {
            inner: StdHost::new(),
            refuse: Some(name),
            joins: true,
        }
    }

    /// Never resolve an identity on join; threads run detached
    pub fn unjoinable() -> Self {
        Self {
            inner: StdHost::new(),
            refuse: None,
            joins: false,
        }
    }

    pub fn live_threads(&self) -> usize {
        self.inner.live_threads()
    }
}

impl ThreadHost for FaultyHost {
    fn spawn<F>(&self, name: &str, entry: F) -> EngineResult<ThreadIdentity>
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(refuse) = self.refuse.filter(|r| *r == name) {
            return Err(SpawnError::Refused(refuse).into());
        }
        self.inner.spawn(name, entry)
    }

    fn join(&self, id: ThreadIdentity) -> bool {
        self.joins && self.inner.join(id)
    }

    fn sleep(&self, duration: Duration) {
        self.inner.sleep(duration)
    }

    fn cycles(&self) -> u64 {
        self.inner.cycles()
    }
}

/// Placement that refuses one role and accepts the other
pub struct RefusingPlacement(pub Role);

impl Placement for RefusingPlacement {
    fn apply(&self, role: Role, cpu: usize) -> Result<(), PlacementError> {
        if role == self.0 {
            return Err(PlacementError::InvalidCpu(cpu));
        }
        Ok(())
    }

    fn current_cpu(&self) -> Option<usize> {
        None
    }
}

/// Device host whose alias creation always fails
pub struct NoAliasHost(pub FsDeviceHost);

impl DeviceHost for NoAliasHost {
    fn create_device(&self, name: &str) -> Result<DeviceHandle, DeviceError> {
        self.0.create_device(name)
    }

    fn create_alias(&self, alias: &str, _device: &DeviceHandle) -> Result<AliasHandle, DeviceError> {
        Err(DeviceError::Exists(alias.to_string()))
    }

    fn delete_alias(&self, alias: AliasHandle) {
        self.0.delete_alias(alias)
    }

    fn delete_device(&self, device: DeviceHandle) {
        self.0.delete_device(device)
    }
}

/// Fresh per-process scratch directory
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mwait-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}
