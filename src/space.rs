//! Space (virtual desktop) operations.
//!
//! All of these need the Dock-side space support (`DOCK_SPACES`) plus the
//! specific capability for the mutation.

use crate::command::{Command, SpaceId};
use crate::context::Context;
use crate::error::Result;
use crate::traits::Connector;

impl<C: Connector> Context<C> {
    /// Create a new space on the display that contains `sid`.
    pub fn space_create(&self, sid: SpaceId) -> Result<()> {
        self.call_ack(Command::SpaceCreate { sid })
    }

    pub fn space_destroy(&self, sid: SpaceId) -> Result<()> {
        self.call_ack(Command::SpaceDestroy { sid })
    }

    /// Switch to `sid`.
    pub fn space_focus(&self, sid: SpaceId) -> Result<()> {
        self.call_ack(Command::SpaceFocus { sid })
    }

    /// Move space `src` to the display showing `dst`.
    ///
    /// `src_prev` is focused on the source display in its place; `focus`
    /// decides whether `src` becomes active on the destination display.
    pub fn space_move(
        &self,
        src: SpaceId,
        dst: SpaceId,
        src_prev: SpaceId,
        focus: bool,
    ) -> Result<()> {
        self.call_ack(Command::SpaceMove {
            src,
            dst,
            src_prev,
            focus,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::command::{Capabilities, Command};
    use crate::context::Context;
    use crate::error::ErrorKind;
    use crate::ipc::mock::{MockConnector, MockExtension};

    #[test]
    fn space_commands_reach_the_extension() {
        let ext = MockExtension::new(Capabilities::ALL, "1.0");
        let ctx = Context::with_connector("/tmp/unused", MockConnector::new(ext.clone()));
        ctx.handshake().unwrap();

        ctx.space_create(10).unwrap();
        ctx.space_focus(11).unwrap();
        ctx.space_move(11, 20, 10, true).unwrap();
        ctx.space_destroy(10).unwrap();

        assert_eq!(
            ext.commands(),
            vec![
                Command::SpaceCreate { sid: 10 },
                Command::SpaceFocus { sid: 11 },
                Command::SpaceMove {
                    src: 11,
                    dst: 20,
                    src_prev: 10,
                    focus: true
                },
                Command::SpaceDestroy { sid: 10 },
            ]
        );
    }

    #[test]
    fn space_mutations_are_gated_per_capability() {
        let ext = MockExtension::new(Capabilities::DOCK_SPACES | Capabilities::ADD_SPACE, "1.0");
        let ctx = Context::with_connector("/tmp/unused", MockConnector::new(ext.clone()));
        ctx.handshake().unwrap();

        assert!(ctx.space_create(1).is_ok());
        assert!(ctx.space_focus(1).is_ok());
        assert_eq!(ctx.space_destroy(1).unwrap_err().kind(), ErrorKind::Operation);
        assert_eq!(
            ctx.space_move(1, 2, 3, false).unwrap_err().kind(),
            ErrorKind::Operation
        );
        assert_eq!(ext.commands().len(), 2);
    }
}
