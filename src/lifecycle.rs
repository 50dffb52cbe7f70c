//! Installing, removing and loading the scripting addition.
//!
//! The privileged work is delegated to a [`System`] backend so the flows can
//! be exercised without root.  Nothing is rolled back when a later step
//! fails: a bundle copied by `load` stays installed even if injection does
//! not succeed.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::traits::{Connector, System};
use log::{info, warn};

impl<C: Connector> Context<C> {
    /// Check that the scripting addition could be loaded right now.
    ///
    /// Fails with [`Error::Root`] when not running as root and with
    /// [`Error::Load`] when system protections are still in place.
    pub fn check_requirements<S: System>(&self, system: &S) -> Result<()> {
        if !system.is_root() {
            return Err(Error::Root);
        }
        system.protections().map_err(|reason| {
            warn!("requirements not met: {}", reason);
            Error::Load(reason)
        })
    }

    /// Copy the bundle into the scripting additions directory, replacing
    /// any existing copy.
    pub fn install<S: System>(&self, system: &S) -> Result<()> {
        if !system.is_root() {
            return Err(Error::Root);
        }
        system
            .install_payload()
            .map_err(|e| Error::Install(e.to_string()))?;
        info!("scripting addition installed");
        Ok(())
    }

    pub fn uninstall<S: System>(&self, system: &S) -> Result<()> {
        if !system.is_root() {
            return Err(Error::Root);
        }
        system
            .uninstall_payload()
            .map_err(|e| Error::Install(e.to_string()))?;
        info!("scripting addition uninstalled");
        Ok(())
    }

    /// Install if needed, inject, then reconnect to pick up the freshly
    /// loaded capabilities.
    pub fn load<S: System>(&self, system: &S) -> Result<()> {
        self.check_requirements(system)?;
        if !system.is_installed() {
            self.install(system)?;
        }
        system.inject().map_err(|e| Error::Load(e.to_string()))?;
        info!("scripting addition injected");
        let hs = self.reconnect()?;
        info!("loaded, capabilities {}", hs.capabilities);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::command::Capabilities;
    use crate::context::Context;
    use crate::error::{Error, ErrorKind};
    use crate::ipc::mock::{MockConnector, MockExtension};
    use crate::traits::System;
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct FakeError(&'static str);

    /// Scriptable [`System`] that records the privileged steps it was asked
    /// to perform.
    struct FakeSystem {
        root: bool,
        protections: Result<(), String>,
        installed: Cell<bool>,
        fail_install: bool,
        fail_inject: bool,
        log: RefCell<Vec<&'static str>>,
    }

    impl Default for FakeSystem {
        fn default() -> Self {
            Self {
                root: true,
                protections: Ok(()),
                installed: Cell::new(false),
                fail_install: false,
                fail_inject: false,
                log: RefCell::new(Vec::new()),
            }
        }
    }

    impl System for FakeSystem {
        type Error = FakeError;

        fn is_root(&self) -> bool {
            self.root
        }

        fn protections(&self) -> Result<(), String> {
            self.protections.clone()
        }

        fn is_installed(&self) -> bool {
            self.installed.get()
        }

        fn install_payload(&self) -> Result<(), FakeError> {
            self.log.borrow_mut().push("install");
            if self.fail_install {
                return Err(FakeError("disk full"));
            }
            self.installed.set(true);
            Ok(())
        }

        fn uninstall_payload(&self) -> Result<(), FakeError> {
            self.log.borrow_mut().push("uninstall");
            self.installed.set(false);
            Ok(())
        }

        fn inject(&self) -> Result<(), FakeError> {
            self.log.borrow_mut().push("inject");
            if self.fail_inject {
                return Err(FakeError("Dock not running"));
            }
            Ok(())
        }
    }

    fn context(ext: &Arc<MockExtension>) -> Context<MockConnector> {
        Context::with_connector("/tmp/unused", MockConnector::new(ext.clone()))
    }

    #[test]
    fn non_root_is_rejected_everywhere() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem {
            root: false,
            ..FakeSystem::default()
        };
        assert!(matches!(ctx.check_requirements(&sys), Err(Error::Root)));
        assert!(matches!(ctx.install(&sys), Err(Error::Root)));
        assert!(matches!(ctx.uninstall(&sys), Err(Error::Root)));
        assert!(matches!(ctx.load(&sys), Err(Error::Root)));
        assert!(sys.log.borrow().is_empty());
    }

    #[test]
    fn protections_surface_as_load_with_reason() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem {
            protections: Err("System Integrity Protection is enabled".into()),
            ..FakeSystem::default()
        };
        match ctx.check_requirements(&sys) {
            Err(Error::Load(reason)) => assert!(reason.contains("Integrity")),
            other => panic!("unexpected {:?}", other.err()),
        }
        assert_eq!(ctx.load(&sys).unwrap_err().kind(), ErrorKind::Load);
        assert!(sys.log.borrow().is_empty());
    }

    #[test]
    fn install_failure_is_install_error() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem {
            fail_install: true,
            ..FakeSystem::default()
        };
        let err = ctx.install(&sys).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Install);
        assert!(err.to_string().contains("disk full"));
        assert_eq!(ctx.load(&sys).unwrap_err().kind(), ErrorKind::Install);
    }

    #[test]
    fn uninstall_of_missing_bundle_succeeds() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem::default();
        ctx.uninstall(&sys).unwrap();
        assert_eq!(*sys.log.borrow(), vec!["uninstall"]);
    }

    #[test]
    fn load_installs_injects_and_refreshes_capabilities() {
        let ext = MockExtension::new(Capabilities::SET_WINDOW, "1.0");
        let ctx = context(&ext);
        ctx.handshake().unwrap();
        assert_eq!(ctx.capabilities(), Some(Capabilities::SET_WINDOW));

        ext.set_handshake(Capabilities::ALL, "2.0");
        let sys = FakeSystem::default();
        ctx.load(&sys).unwrap();

        assert_eq!(*sys.log.borrow(), vec!["install", "inject"]);
        assert_eq!(ctx.capabilities(), Some(Capabilities::ALL));
        assert_eq!(ctx.version().as_deref(), Some("2.0"));
        assert!(ctx.space_focus(1).is_ok());
    }

    #[test]
    fn load_skips_install_when_present() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem::default();
        sys.installed.set(true);
        ctx.load(&sys).unwrap();
        assert_eq!(*sys.log.borrow(), vec!["inject"]);
    }

    #[test]
    fn inject_failure_is_load_error_and_keeps_bundle() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = context(&ext);
        let sys = FakeSystem {
            fail_inject: true,
            ..FakeSystem::default()
        };
        let err = ctx.load(&sys).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(sys.installed.get());
        assert!(!ctx.is_connected());
    }

    #[test]
    fn load_without_listener_reports_not_loaded() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        ext.set_listening(false);
        let ctx = context(&ext);
        let sys = FakeSystem::default();
        assert_eq!(ctx.load(&sys).unwrap_err().kind(), ErrorKind::NotLoaded);
        assert_eq!(*sys.log.borrow(), vec!["install", "inject"]);
    }
}
