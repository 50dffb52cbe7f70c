//! Window operations.
//!
//! Mutations need `SET_WINDOW` (plus `ANIM_TIME` for fades and `DPPM` for
//! moving between spaces).  Queries need no capability at all.

use crate::command::{
    Command, Frame, Reply, SpaceId, WindowAnimation, WindowId, WindowLayer, WindowOrder,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::ipc::codec::ProtocolError;
use crate::traits::Connector;

fn mismatch() -> Error {
    ProtocolError::ShapeMismatch.into()
}

impl<C: Connector> Context<C> {
    /// Move the window's top-left corner to `(x, y)`.
    pub fn window_move(&self, wid: WindowId, x: i32, y: i32) -> Result<()> {
        self.call_ack(Command::WindowMove { wid, x, y })
    }

    /// Set opacity immediately.  `opacity` must lie in `[0.0, 1.0]`.
    pub fn window_set_opacity(&self, wid: WindowId, opacity: f32) -> Result<()> {
        self.call_ack(Command::WindowSetOpacity { wid, opacity })
    }

    /// Animate opacity to `opacity` over `duration` seconds.
    pub fn window_fade_opacity(&self, wid: WindowId, opacity: f32, duration: f32) -> Result<()> {
        self.call_ack(Command::WindowFadeOpacity {
            wid,
            opacity,
            duration,
        })
    }

    pub fn window_set_layer(&self, wid: WindowId, layer: WindowLayer) -> Result<()> {
        self.call_ack(Command::WindowSetLayer { wid, layer })
    }

    /// Show the window on every space.
    pub fn window_set_sticky(&self, wid: WindowId, sticky: bool) -> Result<()> {
        self.call_ack(Command::WindowSetSticky { wid, sticky })
    }

    pub fn window_set_shadow(&self, wid: WindowId, shadow: bool) -> Result<()> {
        self.call_ack(Command::WindowSetShadow { wid, shadow })
    }

    pub fn window_focus(&self, wid: WindowId) -> Result<()> {
        self.call_ack(Command::WindowFocus { wid })
    }

    /// Transform the window to fill the rectangle `(x, y, w, h)` without
    /// resizing its contents.
    pub fn window_scale(&self, wid: WindowId, x: f32, y: f32, w: f32, h: f32) -> Result<()> {
        self.call_ack(Command::WindowScale { wid, x, y, w, h })
    }

    /// Reorder `wid` relative to `relative`.  With [`WindowOrder::Out`] the
    /// window is taken out of the window list and `relative` is ignored.
    pub fn window_order(&self, wid: WindowId, order: WindowOrder, relative: WindowId) -> Result<()> {
        self.call_ack(Command::WindowOrder {
            wid,
            order,
            relative,
        })
    }

    /// Order every window in `wids` back in.
    pub fn window_order_in(&self, wids: &[WindowId]) -> Result<()> {
        self.call_ack(Command::WindowOrderIn {
            wids: wids.to_vec(),
        })
    }

    pub fn window_move_to_space(&self, wid: WindowId, sid: SpaceId) -> Result<()> {
        self.call_ack(Command::WindowMoveToSpace { wid, sid })
    }

    pub fn window_list_move_to_space(&self, wids: &[WindowId], sid: SpaceId) -> Result<()> {
        self.call_ack(Command::WindowListMoveToSpace {
            wids: wids.to_vec(),
            sid,
        })
    }

    pub fn window_resize(&self, wid: WindowId, width: i32, height: i32) -> Result<()> {
        self.call_ack(Command::WindowResize { wid, width, height })
    }

    /// Move and resize in one step.
    pub fn window_set_frame(
        &self,
        wid: WindowId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<()> {
        self.call_ack(Command::WindowSetFrame {
            wid,
            frame: Frame {
                x,
                y,
                width,
                height,
            },
        })
    }

    pub fn window_minimize(&self, wid: WindowId) -> Result<()> {
        self.call_ack(Command::WindowMinimize { wid })
    }

    pub fn window_unminimize(&self, wid: WindowId) -> Result<()> {
        self.call_ack(Command::WindowUnminimize { wid })
    }

    pub fn window_is_minimized(&self, wid: WindowId) -> Result<bool> {
        match self.call(Command::WindowIsMinimized { wid })? {
            Reply::Bool(minimized) => Ok(minimized),
            _ => Err(mismatch()),
        }
    }

    pub fn window_get_opacity(&self, wid: WindowId) -> Result<f32> {
        match self.call(Command::WindowGetOpacity { wid })? {
            Reply::Float(opacity) => Ok(opacity),
            _ => Err(mismatch()),
        }
    }

    pub fn window_get_frame(&self, wid: WindowId) -> Result<Frame> {
        match self.call(Command::WindowGetFrame { wid })? {
            Reply::Frame(frame) => Ok(frame),
            _ => Err(mismatch()),
        }
    }

    pub fn window_is_sticky(&self, wid: WindowId) -> Result<bool> {
        match self.call(Command::WindowIsSticky { wid })? {
            Reply::Bool(sticky) => Ok(sticky),
            _ => Err(mismatch()),
        }
    }

    pub fn window_get_layer(&self, wid: WindowId) -> Result<WindowLayer> {
        match self.call(Command::WindowGetLayer { wid })? {
            Reply::Layer(layer) => Ok(layer),
            _ => Err(mismatch()),
        }
    }

    /// Swap each window for its proxy ahead of an animation.
    pub fn window_swap_proxy_in(&self, animations: &[WindowAnimation]) -> Result<()> {
        self.call_ack(Command::WindowSwapProxyIn {
            animations: animations.to_vec(),
        })
    }

    /// Undo [`window_swap_proxy_in`](Self::window_swap_proxy_in).
    pub fn window_swap_proxy_out(&self, animations: &[WindowAnimation]) -> Result<()> {
        self.call_ack(Command::WindowSwapProxyOut {
            animations: animations.to_vec(),
        })
    }
}
