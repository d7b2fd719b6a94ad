//! `RegistrationService`: one address-keyed cache per engine, sitting on
//! top of the engine-specific [`BackendRegistrar`]s. Registration is
//! idempotent per address (spec §4.F): repeat calls for the same
//! `virtual_address` return the cached handle instead of calling the
//! registrar again.

use std::collections::HashMap;
use std::sync::Mutex;

use qcnode_memory::{Descriptor, Status};

use crate::kind::{BackendHandle, BackendKind, Direction};
use crate::registrar::BackendRegistrar;

pub struct RegistrationService {
    registrars: HashMap<BackendKind, Box<dyn BackendRegistrar>>,
    cache: Mutex<HashMap<(BackendKind, usize), BackendHandle>>,
}

impl RegistrationService {
    pub fn new() -> Self {
        Self {
            registrars: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_engine(&mut self, kind: BackendKind, registrar: Box<dyn BackendRegistrar>) {
        self.registrars.insert(kind, registrar);
    }

    /// `RegBuf(descriptor, direction) -> handle`. Idempotent per
    /// `(engine, virtual_address)`.
    pub fn reg_buf(
        &self,
        kind: BackendKind,
        descriptor: &Descriptor,
        direction: Direction,
    ) -> Result<BackendHandle, Status> {
        let base = descriptor.base().ok_or(Status::InvalidBuf)?;
        let key = (kind, base.virtual_address);

        if let Some(handle) = self.cache.lock().unwrap().get(&key).copied() {
            return Ok(handle);
        }

        let registrar = self.registrars.get(&kind).ok_or(Status::Unsupported)?;
        let handle = registrar.register(descriptor, direction)?;
        self.cache.lock().unwrap().insert(key, handle);
        Ok(handle)
    }

    /// `DeregBuf(virtualAddress)`: refcount-free and terminal for every
    /// engine that has this address cached.
    pub fn dereg_buf(&self, virtual_address: usize) {
        let mut cache = self.cache.lock().unwrap();
        let keys: Vec<_> = cache
            .keys()
            .filter(|(_, addr)| *addr == virtual_address)
            .copied()
            .collect();
        for key in keys {
            cache.remove(&key);
            if let Some(registrar) = self.registrars.get(&key.0) {
                registrar.deregister(virtual_address);
            }
        }
    }
}

impl Default for RegistrationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcnode_memory::BaseFields;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingRegistrar {
        calls: AtomicU64,
    }

    impl BackendRegistrar for CountingRegistrar {
        fn register(&self, _descriptor: &Descriptor, _direction: Direction) -> Result<BackendHandle, Status> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(BackendHandle(n))
        }

        fn deregister(&self, _virtual_address: usize) {}
    }

    fn descriptor_at(addr: usize) -> Descriptor {
        Descriptor::Raw(BaseFields {
            virtual_address: addr,
            ..Default::default()
        })
    }

    #[test]
    fn register_is_idempotent_per_address() {
        let mut svc = RegistrationService::new();
        svc.add_engine(
            BackendKind::EglGbm,
            Box::new(CountingRegistrar { calls: AtomicU64::new(0) }),
        );
        let d = descriptor_at(0x4000);
        let first = svc.reg_buf(BackendKind::EglGbm, &d, Direction::Input).unwrap();
        let second = svc.reg_buf(BackendKind::EglGbm, &d, Direction::Input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deregister_then_register_reregisters() {
        let mut svc = RegistrationService::new();
        svc.add_engine(
            BackendKind::EglGbm,
            Box::new(CountingRegistrar { calls: AtomicU64::new(0) }),
        );
        let d = descriptor_at(0x4000);
        let first = svc.reg_buf(BackendKind::EglGbm, &d, Direction::Input).unwrap();
        svc.dereg_buf(0x4000);
        let second = svc.reg_buf(BackendKind::EglGbm, &d, Direction::Input).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unregistered_engine_is_unsupported() {
        let svc = RegistrationService::new();
        let d = descriptor_at(0x4000);
        assert_eq!(
            svc.reg_buf(BackendKind::Htp, &d, Direction::Input),
            Err(Status::Unsupported)
        );
    }
}
