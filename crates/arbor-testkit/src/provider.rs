//! Scripted in-memory handle provider
//!
//! `FakeProvider` serves an [`ObjectModel`] and keeps a full account of
//! handle traffic: which handles are live, the order handles were released
//! in and how many times each one was released. Failures and latency can be
//! injected per operation.
//!
//! Every property resolution mints a fresh handle, the way automation
//! servers hand out a new reference per lookup.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::Mutex` for the provider state. The lock is never held
//! while an injected delay sleeps, so concurrent calls really overlap.

use crate::model::{ObjectModel, Scalar};
use arbor_core::{HandleProvider, ProviderError, RawHandle, RootHandles, Value};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Provider operation, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `create_root`
    CreateRoot,
    /// `get_property`
    GetProperty,
    /// `put_property`
    PutProperty,
    /// `call_method`
    CallMethod,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::CreateRoot => "create_root",
            Self::GetProperty => "get_property",
            Self::PutProperty => "put_property",
            Self::CallMethod => "call_method",
        }
    }
}

/// Which role a handle plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Application object behind a root
    Application,
    /// Navigable dispatch handle
    Dispatch,
}

/// A handle currently held by the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveHandle {
    /// Object the handle refers to
    pub object: String,
    /// Role of the handle
    pub kind: HandleKind,
}

/// One entry of the release log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedHandle {
    /// Released handle
    pub handle: RawHandle,
    /// Object the handle referred to
    pub object: String,
    /// Role of the handle
    pub kind: HandleKind,
}

/// One forwarded call, as seen by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Operation performed
    pub operation: Operation,
    /// Object the call was made on
    pub object: String,
    /// Property or method name
    pub name: String,
    /// Call arguments
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct FakeState {
    model: ObjectModel,
    next_handle: u64,
    live: HashMap<RawHandle, LiveHandle>,
    released: Vec<ReleasedHandle>,
    release_counts: HashMap<RawHandle, u32>,
    failures: HashMap<(Operation, String), String>,
    failing_releases: HashSet<String>,
    calls: Vec<CallRecord>,
    get_delay: Duration,
    release_delay: Duration,
}

impl FakeState {
    fn mint(&mut self, object: &str, kind: HandleKind) -> RawHandle {
        self.next_handle += 1;
        let handle = RawHandle(self.next_handle);
        self.live.insert(
            handle,
            LiveHandle {
                object: object.to_string(),
                kind,
            },
        );
        handle
    }

    fn object_of(&self, operation: Operation, handle: RawHandle) -> Result<String, ProviderError> {
        self.live
            .get(&handle)
            .map(|live| live.object.clone())
            .ok_or_else(|| ProviderError::new(operation.name(), format!("stale {handle}")))
    }

    fn injected(&self, operation: Operation, name: &str) -> Result<(), ProviderError> {
        match self.failures.get(&(operation, name.to_string())) {
            Some(message) => {
                debug!(operation = operation.name(), name, %message, "injected failure");
                Err(ProviderError::new(operation.name(), message.clone()))
            }
            None => Ok(()),
        }
    }

    fn record(&mut self, operation: Operation, object: &str, name: &str, args: &[Value]) {
        self.calls.push(CallRecord {
            operation,
            object: object.to_string(),
            name: name.to_string(),
            args: args.to_vec(),
        });
    }
}

/// Scripted in-memory provider
#[derive(Debug, Default)]
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    /// Serve `model`
    pub fn new(model: ObjectModel) -> Self {
        Self {
            state: Mutex::new(FakeState {
                model,
                ..FakeState::default()
            }),
        }
    }

    /// Make `operation` on member `name` fail with `message`.
    ///
    /// For `CreateRoot`, `name` is the root identifier.
    pub fn fail(&self, operation: Operation, name: &str, message: &str) {
        self.state
            .lock()
            .failures
            .insert((operation, name.to_string()), message.to_string());
    }

    /// Report failure when releasing any handle to `object`. The handle is
    /// still accounted as released.
    pub fn fail_release_of(&self, object: &str) {
        self.state.lock().failing_releases.insert(object.to_string());
    }

    /// Delay every `get_property` call
    pub fn set_get_delay(&self, delay: Duration) {
        self.state.lock().get_delay = delay;
    }

    /// Delay every `release` call
    pub fn set_release_delay(&self, delay: Duration) {
        self.state.lock().release_delay = delay;
    }

    /// Release log in release order
    pub fn release_log(&self) -> Vec<ReleasedHandle> {
        self.state.lock().released.clone()
    }

    /// Objects of released dispatch handles, in release order
    pub fn released_objects(&self) -> Vec<String> {
        self.state
            .lock()
            .released
            .iter()
            .filter(|r| r.kind == HandleKind::Dispatch)
            .map(|r| r.object.clone())
            .collect()
    }

    /// Number of times `handle` was released, including bogus releases
    pub fn release_count(&self, handle: RawHandle) -> u32 {
        self.state
            .lock()
            .release_counts
            .get(&handle)
            .copied()
            .unwrap_or(0)
    }

    /// Handles released more than once
    pub fn double_releases(&self) -> Vec<RawHandle> {
        let mut handles: Vec<RawHandle> = self
            .state
            .lock()
            .release_counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// Handles minted and not yet released
    pub fn live_handles(&self) -> HashMap<RawHandle, LiveHandle> {
        self.state.lock().live.clone()
    }

    /// Number of handles minted so far
    pub fn minted(&self) -> u64 {
        self.state.lock().next_handle
    }

    /// Forwarded calls in arrival order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.clone()
    }

    /// Current value of a scalar property
    pub fn property(&self, object: &str, name: &str) -> Option<Scalar> {
        self.state
            .lock()
            .model
            .objects
            .get(object)
            .and_then(|spec| spec.properties.get(name).cloned())
    }
}

impl HandleProvider for FakeProvider {
    fn create_root(&self, identifier: &str) -> Result<RootHandles, ProviderError> {
        let mut state = self.state.lock();
        state.injected(Operation::CreateRoot, identifier)?;
        let object = state.model.roots.get(identifier).cloned().ok_or_else(|| {
            ProviderError::new("create_root", format!("unknown program id {identifier}"))
        })?;
        let application = state.mint(&object, HandleKind::Application);
        let dispatch = state.mint(&object, HandleKind::Dispatch);
        Ok(RootHandles {
            application,
            dispatch,
        })
    }

    fn get_property(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError> {
        let delay = self.state.lock().get_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        let object = state.object_of(Operation::GetProperty, handle)?;
        state.injected(Operation::GetProperty, name)?;
        state.record(Operation::GetProperty, &object, name, args);

        let spec = state.model.objects.get(&object).cloned().unwrap_or_default();
        if let Some(target) = spec.children.get(name) {
            return Ok(Value::Handle(state.mint(target, HandleKind::Dispatch)));
        }
        if let Some(targets) = spec.items.get(name) {
            let index = match args.first() {
                Some(Value::Int(index)) if *index >= 1 => *index as usize,
                _ => {
                    return Err(ProviderError::new(
                        "get_property",
                        format!("{object}.{name} needs a 1-based index"),
                    ))
                }
            };
            let target = targets.get(index - 1).ok_or_else(|| {
                ProviderError::new(
                    "get_property",
                    format!("{object}.{name}({index}) is out of range"),
                )
            })?;
            return Ok(Value::Handle(state.mint(target, HandleKind::Dispatch)));
        }
        if let Some(value) = spec.properties.get(name) {
            return Ok(value.to_value());
        }
        Err(ProviderError::new(
            "get_property",
            format!("{object} has no member {name}"),
        ))
    }

    fn put_property(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        let object = state.object_of(Operation::PutProperty, handle)?;
        state.injected(Operation::PutProperty, name)?;
        state.record(Operation::PutProperty, &object, name, args);

        let value = args.first().and_then(Scalar::from_value).ok_or_else(|| {
            ProviderError::new("put_property", format!("{name} needs a scalar argument"))
        })?;
        let spec = state
            .model
            .objects
            .get_mut(&object)
            .filter(|spec| spec.properties.contains_key(name))
            .ok_or_else(|| {
                ProviderError::new("put_property", format!("{object} has no property {name}"))
            })?;
        spec.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn call_method(
        &self,
        handle: RawHandle,
        name: &str,
        args: &[Value],
    ) -> Result<Value, ProviderError> {
        let mut state = self.state.lock();
        let object = state.object_of(Operation::CallMethod, handle)?;
        state.injected(Operation::CallMethod, name)?;
        state.record(Operation::CallMethod, &object, name, args);

        let known = state
            .model
            .objects
            .get(&object)
            .is_some_and(|spec| spec.methods.iter().any(|m| m == name));
        if known {
            Ok(Value::Empty)
        } else {
            Err(ProviderError::new(
                "call_method",
                format!("{object} has no method {name}"),
            ))
        }
    }

    fn release(&self, handle: RawHandle) -> Result<(), ProviderError> {
        let delay = self.state.lock().release_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        *state.release_counts.entry(handle).or_insert(0) += 1;

        let Some(live) = state.live.remove(&handle) else {
            debug!(%handle, "release of a handle that is not live");
            return Err(ProviderError::new(
                "release",
                format!("{handle} is not live"),
            ));
        };
        let failing = state.failing_releases.contains(&live.object);
        state.released.push(ReleasedHandle {
            handle,
            object: live.object.clone(),
            kind: live.kind,
        });

        debug!(%handle, object = %live.object, kind = ?live.kind, failing, "handle released");
        if failing {
            Err(ProviderError::new(
                "release",
                format!("{} refused to release", live.object),
            ))
        } else {
            Ok(())
        }
    }
}
