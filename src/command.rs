//! Commands and types used throughout mss.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every request the scripting addition understands,
//! [`Reply`] the typed payload it answers with, and [`Capabilities`] /
//! [`Handshake`] what the remote side advertised when the session opened.
//!
//! Window, space and display ids are owned by the window server.  The client
//! never allocates or caches them; they are passed through as plain
//! integers.

use serde::{Serialize, Serializer};
use std::fmt;

/// Window server window id.
pub type WindowId = u32;
/// Window server space id.
pub type SpaceId = u64;
/// Window server display id.
pub type DisplayId = u32;

/// Client library version (`MSS_VERSION`).
pub const LIBRARY_VERSION: &str = "0.0.6";

/// Upper bound on every id list carried in a single frame.
pub const MAX_LIST_LEN: usize = 1024;

//  Capabilities

/// Feature flags reported by the scripting addition during the handshake.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Self = Self(0);
    pub const DOCK_SPACES: Self = Self(0x01);
    pub const DPPM: Self = Self(0x02);
    pub const ADD_SPACE: Self = Self(0x04);
    pub const REM_SPACE: Self = Self(0x08);
    pub const MOV_SPACE: Self = Self(0x10);
    pub const SET_WINDOW: Self = Self(0x20);
    pub const ANIM_TIME: Self = Self(0x40);
    pub const ALL: Self = Self(0x7F);

    const NAMED: [(Self, &'static str); 7] = [
        (Self::DOCK_SPACES, "DOCK_SPACES"),
        (Self::DPPM, "DPPM"),
        (Self::ADD_SPACE, "ADD_SPACE"),
        (Self::REM_SPACE, "REM_SPACE"),
        (Self::MOV_SPACE, "MOV_SPACE"),
        (Self::SET_WINDOW, "SET_WINDOW"),
        (Self::ANIM_TIME, "ANIM_TIME"),
    ];

    /// Wrap raw bits as received on the wire.  Unknown bits are kept.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The flags of `required` that `self` lacks.
    pub const fn missing(self, required: Self) -> Self {
        Self(required.0 & !self.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Names of the known flags that are set, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            return write!(f, "{{}}");
        }
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities({:#04x} {})", self.0, self)
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Result of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    pub capabilities: Capabilities,
    /// Version string advertised by the scripting addition.
    pub version: String,
}

//  Enumerations

/// Window layer levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowLayer {
    /// `kCGBackstopMenuLevel`
    Below,
    /// `kCGNormalWindowLevel`
    Normal,
    /// `kCGFloatingWindowLevel`
    Above,
}

impl WindowLayer {
    pub fn to_wire(self) -> i32 {
        match self {
            WindowLayer::Below => 3,
            WindowLayer::Normal => 4,
            WindowLayer::Above => 5,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            3 => Some(WindowLayer::Below),
            4 => Some(WindowLayer::Normal),
            5 => Some(WindowLayer::Above),
            _ => None,
        }
    }
}

/// How [`Command::WindowOrder`] places a window relative to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowOrder {
    Out,
    Above,
    Below,
}

impl WindowOrder {
    pub fn to_wire(self) -> i32 {
        match self {
            WindowOrder::Out => 0,
            WindowOrder::Above => 1,
            WindowOrder::Below => -1,
        }
    }

    pub fn from_wire(value: i32) -> Option<Self> {
        match value {
            0 => Some(WindowOrder::Out),
            1 => Some(WindowOrder::Above),
            -1 => Some(WindowOrder::Below),
            _ => None,
        }
    }
}

/// A real window paired with the proxy that stands in for it during a swap
/// animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowAnimation {
    pub wid: WindowId,
    pub proxy_wid: WindowId,
}

/// Window position and size in global display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Frame {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

//  Commands

/// Every request the scripting addition understands.
///
/// Each variant carries only the fields its wire payload needs.  The reply
/// shape is fixed per variant, see [`Command::reply_shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SpaceCreate { sid: SpaceId },
    SpaceDestroy { sid: SpaceId },
    SpaceFocus { sid: SpaceId },
    /// Move `src` to the display showing `dst`, focusing `src_prev` on the
    /// source display.
    SpaceMove {
        src: SpaceId,
        dst: SpaceId,
        src_prev: SpaceId,
        focus: bool,
    },

    WindowMove { wid: WindowId, x: i32, y: i32 },
    WindowSetOpacity { wid: WindowId, opacity: f32 },
    /// Animate to `opacity` over `duration` seconds.
    WindowFadeOpacity {
        wid: WindowId,
        opacity: f32,
        duration: f32,
    },
    WindowSetLayer { wid: WindowId, layer: WindowLayer },
    WindowSetSticky { wid: WindowId, sticky: bool },
    WindowSetShadow { wid: WindowId, shadow: bool },
    WindowFocus { wid: WindowId },
    /// Picture-in-picture style transform to the given rectangle.
    WindowScale {
        wid: WindowId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
    WindowOrder {
        wid: WindowId,
        order: WindowOrder,
        relative: WindowId,
    },
    WindowOrderIn { wids: Vec<WindowId> },
    WindowMoveToSpace { wid: WindowId, sid: SpaceId },
    WindowListMoveToSpace { wids: Vec<WindowId>, sid: SpaceId },
    WindowResize {
        wid: WindowId,
        width: i32,
        height: i32,
    },
    WindowSetFrame { wid: WindowId, frame: Frame },
    WindowMinimize { wid: WindowId },
    WindowUnminimize { wid: WindowId },
    WindowIsMinimized { wid: WindowId },
    WindowGetOpacity { wid: WindowId },
    WindowGetFrame { wid: WindowId },
    WindowIsSticky { wid: WindowId },
    WindowGetLayer { wid: WindowId },
    WindowSwapProxyIn { animations: Vec<WindowAnimation> },
    WindowSwapProxyOut { animations: Vec<WindowAnimation> },

    DisplayCount,
    /// Ask for at most `max_count` display ids.
    DisplayList { max_count: u32 },
}

/// Which [`Reply`] variant a command is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    Ack,
    Bool,
    Float,
    Frame,
    Layer,
    Count,
    Ids,
}

/// A successful reply.  The variant always matches the command's
/// [`ReplyShape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    Bool(bool),
    Float(f32),
    Frame(Frame),
    Layer(WindowLayer),
    Count(u32),
    Ids(Vec<u32>),
}

impl Reply {
    pub fn shape(&self) -> ReplyShape {
        match self {
            Reply::Ack => ReplyShape::Ack,
            Reply::Bool(_) => ReplyShape::Bool,
            Reply::Float(_) => ReplyShape::Float,
            Reply::Frame(_) => ReplyShape::Frame,
            Reply::Layer(_) => ReplyShape::Layer,
            Reply::Count(_) => ReplyShape::Count,
            Reply::Ids(_) => ReplyShape::Ids,
        }
    }
}

impl Command {
    /// Short human-readable name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SpaceCreate { .. } => "space create",
            Command::SpaceDestroy { .. } => "space destroy",
            Command::SpaceFocus { .. } => "space focus",
            Command::SpaceMove { .. } => "space move",
            Command::WindowMove { .. } => "window move",
            Command::WindowSetOpacity { .. } => "window set opacity",
            Command::WindowFadeOpacity { .. } => "window fade opacity",
            Command::WindowSetLayer { .. } => "window set layer",
            Command::WindowSetSticky { .. } => "window set sticky",
            Command::WindowSetShadow { .. } => "window set shadow",
            Command::WindowFocus { .. } => "window focus",
            Command::WindowScale { .. } => "window scale",
            Command::WindowOrder { .. } => "window order",
            Command::WindowOrderIn { .. } => "window order in",
            Command::WindowMoveToSpace { .. } => "window move to space",
            Command::WindowListMoveToSpace { .. } => "window list move to space",
            Command::WindowResize { .. } => "window resize",
            Command::WindowSetFrame { .. } => "window set frame",
            Command::WindowMinimize { .. } => "window minimize",
            Command::WindowUnminimize { .. } => "window unminimize",
            Command::WindowIsMinimized { .. } => "window is minimized",
            Command::WindowGetOpacity { .. } => "window get opacity",
            Command::WindowGetFrame { .. } => "window get frame",
            Command::WindowIsSticky { .. } => "window is sticky",
            Command::WindowGetLayer { .. } => "window get layer",
            Command::WindowSwapProxyIn { .. } => "window swap proxy in",
            Command::WindowSwapProxyOut { .. } => "window swap proxy out",
            Command::DisplayCount => "display count",
            Command::DisplayList { .. } => "display list",
        }
    }

    pub fn reply_shape(&self) -> ReplyShape {
        match self {
            Command::WindowIsMinimized { .. } | Command::WindowIsSticky { .. } => ReplyShape::Bool,
            Command::WindowGetOpacity { .. } => ReplyShape::Float,
            Command::WindowGetFrame { .. } => ReplyShape::Frame,
            Command::WindowGetLayer { .. } => ReplyShape::Layer,
            Command::DisplayCount => ReplyShape::Count,
            Command::DisplayList { .. } => ReplyShape::Ids,
            _ => ReplyShape::Ack,
        }
    }

    /// Capabilities the scripting addition must have advertised for this
    /// command to be sent at all.
    pub fn required_capabilities(&self) -> Capabilities {
        use Capabilities as C;
        match self {
            Command::SpaceCreate { .. } => C::DOCK_SPACES | C::ADD_SPACE,
            Command::SpaceDestroy { .. } => C::DOCK_SPACES | C::REM_SPACE,
            Command::SpaceFocus { .. } => C::DOCK_SPACES,
            Command::SpaceMove { .. } => C::DOCK_SPACES | C::MOV_SPACE,
            Command::WindowFadeOpacity { .. } => C::SET_WINDOW | C::ANIM_TIME,
            Command::WindowMoveToSpace { .. } | Command::WindowListMoveToSpace { .. } => {
                C::SET_WINDOW | C::DPPM
            }
            Command::WindowIsMinimized { .. }
            | Command::WindowGetOpacity { .. }
            | Command::WindowGetFrame { .. }
            | Command::WindowIsSticky { .. }
            | Command::WindowGetLayer { .. }
            | Command::DisplayCount
            | Command::DisplayList { .. } => C::NONE,
            _ => C::SET_WINDOW,
        }
    }

    /// Check argument ranges the wire format accepts.
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Command::WindowSetOpacity { opacity, .. } => check_opacity(*opacity),
            Command::WindowFadeOpacity {
                opacity, duration, ..
            } => {
                check_opacity(*opacity)?;
                if !duration.is_finite() || *duration < 0.0 {
                    return Err(format!("fade duration must be >= 0, got {}", duration));
                }
                Ok(())
            }
            Command::WindowScale { x, y, w, h, .. } => {
                if ![x, y, w, h].iter().all(|v| v.is_finite()) {
                    return Err("scale rectangle must be finite".into());
                }
                if *w <= 0.0 || *h <= 0.0 {
                    return Err(format!("scale size must be positive, got {}x{}", w, h));
                }
                Ok(())
            }
            Command::WindowResize { width, height, .. } => check_size(*width, *height),
            Command::WindowSetFrame { frame, .. } => check_size(frame.width, frame.height),
            Command::WindowOrderIn { wids } | Command::WindowListMoveToSpace { wids, .. } => {
                check_list_len(wids.len())
            }
            Command::WindowSwapProxyIn { animations } | Command::WindowSwapProxyOut { animations } => {
                check_list_len(animations.len())
            }
            Command::DisplayList { max_count } => {
                if *max_count == 0 || *max_count as usize > MAX_LIST_LEN {
                    return Err(format!(
                        "max_count must lie in 1..={}, got {}",
                        MAX_LIST_LEN, max_count
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn check_opacity(opacity: f32) -> Result<(), String> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(())
    } else {
        Err(format!("opacity must lie in [0.0, 1.0], got {}", opacity))
    }
}

fn check_size(width: i32, height: i32) -> Result<(), String> {
    if width > 0 && height > 0 {
        Ok(())
    } else {
        Err(format!("size must be positive, got {}x{}", width, height))
    }
}

fn check_list_len(len: usize) -> Result<(), String> {
    if len == 0 {
        return Err("list must not be empty".into());
    }
    if len > MAX_LIST_LEN {
        return Err(format!("list holds {} entries, limit is {}", len, MAX_LIST_LEN));
    }
    Ok(())
}
