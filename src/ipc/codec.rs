//! Binary codec for the scripting addition protocol.
//!
//! # Wire format
//!
//! Every field is written explicitly in little-endian order; floats are
//! IEEE-754 binary32.  Nothing here depends on the in-memory layout of a
//! Rust type.
//!
//! ```text
//! request:  [tag: u16][payload_len: u32][payload]
//! response: [status: u8][payload_len: u32][payload]
//! id list:  [count: u32][id: u32] * count
//! hello:    [capabilities: u32][version_len: u16][version: utf-8]
//! ```
//!
//! Decoders consume their input exactly; short input, trailing bytes and
//! out-of-domain values are all [`ProtocolError`]s.

use crate::command::{
    Capabilities, Command, Frame, Handshake, Reply, ReplyShape, WindowAnimation, WindowLayer,
    WindowOrder, MAX_LIST_LEN,
};

/// Size of a request header.
pub const REQUEST_HEADER_LEN: usize = 6;
/// Size of a response header.
pub const RESPONSE_HEADER_LEN: usize = 5;
/// Largest payload either side may declare.
pub const MAX_PAYLOAD_LEN: u32 = 64 * 1024;
/// Longest version string accepted in a hello.
pub const MAX_VERSION_LEN: usize = 64;

/// Identification sent by the client as the handshake payload.
pub const HELLO_MAGIC: [u8; 4] = *b"MSSC";
pub const PROTOCOL_VERSION: u32 = 1;

pub const TAG_HANDSHAKE: u16 = 0x0001;

const TAG_SPACE_CREATE: u16 = 0x0101;
const TAG_SPACE_DESTROY: u16 = 0x0102;
const TAG_SPACE_FOCUS: u16 = 0x0103;
const TAG_SPACE_MOVE: u16 = 0x0104;
const TAG_WINDOW_MOVE: u16 = 0x0201;
pub const TAG_WINDOW_SET_OPACITY: u16 = 0x0202;
const TAG_WINDOW_FADE_OPACITY: u16 = 0x0203;
const TAG_WINDOW_SET_LAYER: u16 = 0x0204;
const TAG_WINDOW_SET_STICKY: u16 = 0x0205;
const TAG_WINDOW_SET_SHADOW: u16 = 0x0206;
const TAG_WINDOW_FOCUS: u16 = 0x0207;
const TAG_WINDOW_SCALE: u16 = 0x0208;
const TAG_WINDOW_ORDER: u16 = 0x0209;
const TAG_WINDOW_ORDER_IN: u16 = 0x020A;
const TAG_WINDOW_MOVE_TO_SPACE: u16 = 0x020B;
const TAG_WINDOW_LIST_MOVE_TO_SPACE: u16 = 0x020C;
const TAG_WINDOW_RESIZE: u16 = 0x020D;
const TAG_WINDOW_SET_FRAME: u16 = 0x020E;
const TAG_WINDOW_MINIMIZE: u16 = 0x020F;
const TAG_WINDOW_UNMINIMIZE: u16 = 0x0210;
const TAG_WINDOW_IS_MINIMIZED: u16 = 0x0211;
const TAG_WINDOW_GET_OPACITY: u16 = 0x0212;
const TAG_WINDOW_GET_FRAME: u16 = 0x0213;
const TAG_WINDOW_IS_STICKY: u16 = 0x0214;
const TAG_WINDOW_GET_LAYER: u16 = 0x0215;
const TAG_WINDOW_SWAP_PROXY_IN: u16 = 0x0216;
const TAG_WINDOW_SWAP_PROXY_OUT: u16 = 0x0217;
const TAG_DISPLAY_COUNT: u16 = 0x0301;
const TAG_DISPLAY_LIST: u16 = 0x0302;

/// Malformed or unrepresentable frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame truncated")]
    Truncated,
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("unknown command tag {0:#06x}")]
    UnknownTag(u16),
    #[error("unknown response status {0}")]
    UnknownStatus(u8),
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: i64 },
    #[error("list of {0} entries exceeds the list limit")]
    ListTooLong(usize),
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),
    #[error("bad handshake magic")]
    BadMagic,
    #[error("version string is not valid utf-8")]
    InvalidUtf8,
    #[error("reply shape does not match the command")]
    ShapeMismatch,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

//  Primitive writer / reader

struct Writer(Vec<u8>);

impl Writer {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn u8(&mut self, v: u8) {
        self.0.push(v);
    }

    fn bool(&mut self, v: bool) {
        self.0.push(v as u8);
    }

    fn u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.0.extend_from_slice(v);
    }

    fn ids(&mut self, ids: &[u32]) -> Result<()> {
        self.count(ids.len())?;
        for id in ids {
            self.u32(*id);
        }
        Ok(())
    }

    fn count(&mut self, len: usize) -> Result<()> {
        if len > MAX_LIST_LEN {
            return Err(ProtocolError::ListTooLong(len));
        }
        self.u32(len as u32);
        Ok(())
    }

    fn frame(&mut self, frame: &Frame) {
        self.i32(frame.x);
        self.i32(frame.y);
        self.i32(frame.width);
        self.i32(frame.height);
    }
}

/// Bounds-checked cursor over a received payload.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (head, rest) = self.buf.split_at_checked(N).ok_or(ProtocolError::Truncated)?;
        self.buf = rest;
        // `head` is exactly N bytes long.
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn bool(&mut self, field: &'static str) -> Result<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidValue {
                field,
                value: other as i64,
            }),
        }
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let (head, rest) = self.buf.split_at_checked(n).ok_or(ProtocolError::Truncated)?;
        self.buf = rest;
        Ok(head)
    }

    /// Read an element count and check it against both the list bound and
    /// the bytes actually present, so a corrupt count never drives an
    /// allocation.
    fn count(&mut self, element_len: usize) -> Result<usize> {
        let count = self.u32()? as usize;
        if count > MAX_LIST_LEN {
            return Err(ProtocolError::ListTooLong(count));
        }
        if count * element_len > self.buf.len() {
            return Err(ProtocolError::Truncated);
        }
        Ok(count)
    }

    fn ids(&mut self) -> Result<Vec<u32>> {
        self.ids_capped(MAX_LIST_LEN)
    }

    /// Like [`ids`](Self::ids) but keeps at most `cap` entries; the rest are
    /// validated and skipped.
    fn ids_capped(&mut self, cap: usize) -> Result<Vec<u32>> {
        let count = self.count(4)?;
        let kept = count.min(cap);
        let mut ids = Vec::with_capacity(kept);
        for _ in 0..kept {
            ids.push(self.u32()?);
        }
        self.bytes((count - kept) * 4)?;
        Ok(ids)
    }

    fn animations(&mut self) -> Result<Vec<WindowAnimation>> {
        let count = self.count(8)?;
        (0..count)
            .map(|_| {
                Ok(WindowAnimation {
                    wid: self.u32()?,
                    proxy_wid: self.u32()?,
                })
            })
            .collect()
    }

    fn layer(&mut self) -> Result<WindowLayer> {
        let raw = self.i32()?;
        WindowLayer::from_wire(raw).ok_or(ProtocolError::InvalidValue {
            field: "layer",
            value: raw as i64,
        })
    }

    fn frame(&mut self) -> Result<Frame> {
        Ok(Frame {
            x: self.i32()?,
            y: self.i32()?,
            width: self.i32()?,
            height: self.i32()?,
        })
    }

    fn finish(self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes(self.buf.len()))
        }
    }
}

fn frame_with_header(tag: u16, payload: Vec<u8>) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN as usize {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    let mut out = Vec::with_capacity(REQUEST_HEADER_LEN + payload.len());
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Split a full request frame into tag and payload, checking the declared
/// length against what is present.
fn split_request(frame: &[u8]) -> Result<(u16, &[u8])> {
    let mut r = Reader::new(frame);
    let tag = r.u16()?;
    let len = r.u32()?;
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(len as usize));
    }
    let payload = r.bytes(len as usize)?;
    r.finish()?;
    Ok((tag, payload))
}

//  Commands

fn tag_of(command: &Command) -> u16 {
    match command {
        Command::SpaceCreate { .. } => TAG_SPACE_CREATE,
        Command::SpaceDestroy { .. } => TAG_SPACE_DESTROY,
        Command::SpaceFocus { .. } => TAG_SPACE_FOCUS,
        Command::SpaceMove { .. } => TAG_SPACE_MOVE,
        Command::WindowMove { .. } => TAG_WINDOW_MOVE,
        Command::WindowSetOpacity { .. } => TAG_WINDOW_SET_OPACITY,
        Command::WindowFadeOpacity { .. } => TAG_WINDOW_FADE_OPACITY,
        Command::WindowSetLayer { .. } => TAG_WINDOW_SET_LAYER,
        Command::WindowSetSticky { .. } => TAG_WINDOW_SET_STICKY,
        Command::WindowSetShadow { .. } => TAG_WINDOW_SET_SHADOW,
        Command::WindowFocus { .. } => TAG_WINDOW_FOCUS,
        Command::WindowScale { .. } => TAG_WINDOW_SCALE,
        Command::WindowOrder { .. } => TAG_WINDOW_ORDER,
        Command::WindowOrderIn { .. } => TAG_WINDOW_ORDER_IN,
        Command::WindowMoveToSpace { .. } => TAG_WINDOW_MOVE_TO_SPACE,
        Command::WindowListMoveToSpace { .. } => TAG_WINDOW_LIST_MOVE_TO_SPACE,
        Command::WindowResize { .. } => TAG_WINDOW_RESIZE,
        Command::WindowSetFrame { .. } => TAG_WINDOW_SET_FRAME,
        Command::WindowMinimize { .. } => TAG_WINDOW_MINIMIZE,
        Command::WindowUnminimize { .. } => TAG_WINDOW_UNMINIMIZE,
        Command::WindowIsMinimized { .. } => TAG_WINDOW_IS_MINIMIZED,
        Command::WindowGetOpacity { .. } => TAG_WINDOW_GET_OPACITY,
        Command::WindowGetFrame { .. } => TAG_WINDOW_GET_FRAME,
        Command::WindowIsSticky { .. } => TAG_WINDOW_IS_STICKY,
        Command::WindowGetLayer { .. } => TAG_WINDOW_GET_LAYER,
        Command::WindowSwapProxyIn { .. } => TAG_WINDOW_SWAP_PROXY_IN,
        Command::WindowSwapProxyOut { .. } => TAG_WINDOW_SWAP_PROXY_OUT,
        Command::DisplayCount => TAG_DISPLAY_COUNT,
        Command::DisplayList { .. } => TAG_DISPLAY_LIST,
    }
}

/// Encode a command as a complete request frame.
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    match command {
        Command::SpaceCreate { sid } | Command::SpaceDestroy { sid } | Command::SpaceFocus { sid } => {
            w.u64(*sid)
        }
        Command::SpaceMove {
            src,
            dst,
            src_prev,
            focus,
        } => {
            w.u64(*src);
            w.u64(*dst);
            w.u64(*src_prev);
            w.bool(*focus);
        }
        Command::WindowMove { wid, x, y } => {
            w.u32(*wid);
            w.i32(*x);
            w.i32(*y);
        }
        Command::WindowSetOpacity { wid, opacity } => {
            w.u32(*wid);
            w.f32(*opacity);
        }
        Command::WindowFadeOpacity {
            wid,
            opacity,
            duration,
        } => {
            w.u32(*wid);
            w.f32(*opacity);
            w.f32(*duration);
        }
        Command::WindowSetLayer { wid, layer } => {
            w.u32(*wid);
            w.i32(layer.to_wire());
        }
        Command::WindowSetSticky { wid, sticky: flag }
        | Command::WindowSetShadow { wid, shadow: flag } => {
            w.u32(*wid);
            w.bool(*flag);
        }
        Command::WindowFocus { wid }
        | Command::WindowMinimize { wid }
        | Command::WindowUnminimize { wid }
        | Command::WindowIsMinimized { wid }
        | Command::WindowGetOpacity { wid }
        | Command::WindowGetFrame { wid }
        | Command::WindowIsSticky { wid }
        | Command::WindowGetLayer { wid } => w.u32(*wid),
        Command::WindowScale {
            wid,
            x,
            y,
            w: width,
            h: height,
        } => {
            w.u32(*wid);
            w.f32(*x);
            w.f32(*y);
            w.f32(*width);
            w.f32(*height);
        }
        Command::WindowOrder {
            wid,
            order,
            relative,
        } => {
            w.u32(*wid);
            w.i32(order.to_wire());
            w.u32(*relative);
        }
        Command::WindowOrderIn { wids } => w.ids(wids)?,
        Command::WindowMoveToSpace { wid, sid } => {
            w.u32(*wid);
            w.u64(*sid);
        }
        Command::WindowListMoveToSpace { wids, sid } => {
            w.u64(*sid);
            w.ids(wids)?;
        }
        Command::WindowResize { wid, width, height } => {
            w.u32(*wid);
            w.i32(*width);
            w.i32(*height);
        }
        Command::WindowSetFrame { wid, frame } => {
            w.u32(*wid);
            w.frame(frame);
        }
        Command::WindowSwapProxyIn { animations } | Command::WindowSwapProxyOut { animations } => {
            w.count(animations.len())?;
            for a in animations {
                w.u32(a.wid);
                w.u32(a.proxy_wid);
            }
        }
        Command::DisplayCount => {}
        Command::DisplayList { max_count } => w.u32(*max_count),
    }
    frame_with_header(tag_of(command), w.0)
}

/// Decode a complete request frame back into a [`Command`].
///
/// The client never needs this; it exists for servers and test harnesses
/// that speak the protocol.
pub fn decode_command(frame: &[u8]) -> Result<Command> {
    let (tag, payload) = split_request(frame)?;
    let mut r = Reader::new(payload);
    let command = match tag {
        TAG_SPACE_CREATE => Command::SpaceCreate { sid: r.u64()? },
        TAG_SPACE_DESTROY => Command::SpaceDestroy { sid: r.u64()? },
        TAG_SPACE_FOCUS => Command::SpaceFocus { sid: r.u64()? },
        TAG_SPACE_MOVE => Command::SpaceMove {
            src: r.u64()?,
            dst: r.u64()?,
            src_prev: r.u64()?,
            focus: r.bool("focus")?,
        },
        TAG_WINDOW_MOVE => Command::WindowMove {
            wid: r.u32()?,
            x: r.i32()?,
            y: r.i32()?,
        },
        TAG_WINDOW_SET_OPACITY => Command::WindowSetOpacity {
            wid: r.u32()?,
            opacity: r.f32()?,
        },
        TAG_WINDOW_FADE_OPACITY => Command::WindowFadeOpacity {
            wid: r.u32()?,
            opacity: r.f32()?,
            duration: r.f32()?,
        },
        TAG_WINDOW_SET_LAYER => Command::WindowSetLayer {
            wid: r.u32()?,
            layer: r.layer()?,
        },
        TAG_WINDOW_SET_STICKY => Command::WindowSetSticky {
            wid: r.u32()?,
            sticky: r.bool("sticky")?,
        },
        TAG_WINDOW_SET_SHADOW => Command::WindowSetShadow {
            wid: r.u32()?,
            shadow: r.bool("shadow")?,
        },
        TAG_WINDOW_FOCUS => Command::WindowFocus { wid: r.u32()? },
        TAG_WINDOW_SCALE => Command::WindowScale {
            wid: r.u32()?,
            x: r.f32()?,
            y: r.f32()?,
            w: r.f32()?,
            h: r.f32()?,
        },
        TAG_WINDOW_ORDER => {
            let wid = r.u32()?;
            let raw = r.i32()?;
            let order = WindowOrder::from_wire(raw).ok_or(ProtocolError::InvalidValue {
                field: "order",
                value: raw as i64,
            })?;
            Command::WindowOrder {
                wid,
                order,
                relative: r.u32()?,
            }
        }
        TAG_WINDOW_ORDER_IN => Command::WindowOrderIn { wids: r.ids()? },
        TAG_WINDOW_MOVE_TO_SPACE => Command::WindowMoveToSpace {
            wid: r.u32()?,
            sid: r.u64()?,
        },
        TAG_WINDOW_LIST_MOVE_TO_SPACE => {
            let sid = r.u64()?;
            Command::WindowListMoveToSpace {
                wids: r.ids()?,
                sid,
            }
        }
        TAG_WINDOW_RESIZE => Command::WindowResize {
            wid: r.u32()?,
            width: r.i32()?,
            height: r.i32()?,
        },
        TAG_WINDOW_SET_FRAME => Command::WindowSetFrame {
            wid: r.u32()?,
            frame: r.frame()?,
        },
        TAG_WINDOW_MINIMIZE => Command::WindowMinimize { wid: r.u32()? },
        TAG_WINDOW_UNMINIMIZE => Command::WindowUnminimize { wid: r.u32()? },
        TAG_WINDOW_IS_MINIMIZED => Command::WindowIsMinimized { wid: r.u32()? },
        TAG_WINDOW_GET_OPACITY => Command::WindowGetOpacity { wid: r.u32()? },
        TAG_WINDOW_GET_FRAME => Command::WindowGetFrame { wid: r.u32()? },
        TAG_WINDOW_IS_STICKY => Command::WindowIsSticky { wid: r.u32()? },
        TAG_WINDOW_GET_LAYER => Command::WindowGetLayer { wid: r.u32()? },
        TAG_WINDOW_SWAP_PROXY_IN => Command::WindowSwapProxyIn {
            animations: r.animations()?,
        },
        TAG_WINDOW_SWAP_PROXY_OUT => Command::WindowSwapProxyOut {
            animations: r.animations()?,
        },
        TAG_DISPLAY_COUNT => Command::DisplayCount,
        TAG_DISPLAY_LIST => Command::DisplayList {
            max_count: r.u32()?,
        },
        other => return Err(ProtocolError::UnknownTag(other)),
    };
    r.finish()?;
    Ok(command)
}

//  Responses

/// Outcome reported in a response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

/// Fixed-size header preceding every response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: Status,
    pub payload_len: u32,
}

impl ResponseHeader {
    pub fn decode(bytes: &[u8; RESPONSE_HEADER_LEN]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let status = match r.u8()? {
            0 => Status::Success,
            1 => Status::Failure,
            other => return Err(ProtocolError::UnknownStatus(other)),
        };
        let payload_len = r.u32()?;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge(payload_len as usize));
        }
        Ok(Self {
            status,
            payload_len,
        })
    }
}

/// Encode a full response frame: header followed by `payload`.
pub fn encode_response(status: Status, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_LEN as usize {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    let mut w = Writer::new();
    w.u8(match status {
        Status::Success => 0,
        Status::Failure => 1,
    });
    w.u32(payload.len() as u32);
    w.bytes(payload);
    Ok(w.0)
}

/// Encode the payload of a successful reply.
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    match reply {
        Reply::Ack => {}
        Reply::Bool(v) => w.bool(*v),
        Reply::Float(v) => w.f32(*v),
        Reply::Frame(frame) => w.frame(frame),
        Reply::Layer(layer) => w.i32(layer.to_wire()),
        Reply::Count(n) => w.u32(*n),
        Reply::Ids(ids) => w.ids(ids)?,
    }
    Ok(w.0)
}

/// Decode a successful reply payload of the given shape.
pub fn decode_reply(shape: ReplyShape, payload: &[u8]) -> Result<Reply> {
    let mut r = Reader::new(payload);
    let reply = match shape {
        ReplyShape::Ack => Reply::Ack,
        ReplyShape::Bool => Reply::Bool(r.bool("bool reply")?),
        ReplyShape::Float => Reply::Float(r.f32()?),
        ReplyShape::Frame => Reply::Frame(r.frame()?),
        ReplyShape::Layer => Reply::Layer(r.layer()?),
        ReplyShape::Count => Reply::Count(r.u32()?),
        ReplyShape::Ids => Reply::Ids(r.ids()?),
    };
    r.finish()?;
    Ok(reply)
}

/// Decode the reply payload for `command`.
///
/// A display list keeps at most the `max_count` ids the caller asked for,
/// even when the scripting addition reports more.
pub fn decode_reply_for(command: &Command, payload: &[u8]) -> Result<Reply> {
    match command {
        Command::DisplayList { max_count } => {
            let mut r = Reader::new(payload);
            let ids = r.ids_capped(*max_count as usize)?;
            r.finish()?;
            Ok(Reply::Ids(ids))
        }
        _ => decode_reply(command.reply_shape(), payload),
    }
}

//  Handshake

/// The identification frame the client sends first.
pub fn encode_hello_request() -> Vec<u8> {
    let mut w = Writer::new();
    w.bytes(&HELLO_MAGIC);
    w.u32(PROTOCOL_VERSION);
    let mut out = Vec::with_capacity(REQUEST_HEADER_LEN + w.0.len());
    out.extend_from_slice(&TAG_HANDSHAKE.to_le_bytes());
    out.extend_from_slice(&(w.0.len() as u32).to_le_bytes());
    out.extend_from_slice(&w.0);
    out
}

/// Validate a hello request and return the client's protocol version.
pub fn decode_hello_request(frame: &[u8]) -> Result<u32> {
    let (tag, payload) = split_request(frame)?;
    if tag != TAG_HANDSHAKE {
        return Err(ProtocolError::UnknownTag(tag));
    }
    let mut r = Reader::new(payload);
    if r.take::<4>()? != HELLO_MAGIC {
        return Err(ProtocolError::BadMagic);
    }
    let version = r.u32()?;
    r.finish()?;
    Ok(version)
}

/// Encode the server's hello (the handshake reply payload).
pub fn encode_hello(handshake: &Handshake) -> Result<Vec<u8>> {
    let version = handshake.version.as_bytes();
    if version.len() > MAX_VERSION_LEN {
        return Err(ProtocolError::PayloadTooLarge(version.len()));
    }
    let mut w = Writer::new();
    w.u32(handshake.capabilities.bits());
    w.u16(version.len() as u16);
    w.bytes(version);
    Ok(w.0)
}

pub fn decode_hello(payload: &[u8]) -> Result<Handshake> {
    let mut r = Reader::new(payload);
    let capabilities = Capabilities::from_bits(r.u32()?);
    let len = r.u16()? as usize;
    if len > MAX_VERSION_LEN {
        return Err(ProtocolError::PayloadTooLarge(len));
    }
    let version = std::str::from_utf8(r.bytes(len)?)
        .map_err(|_| ProtocolError::InvalidUtf8)?
        .to_owned();
    r.finish()?;
    Ok(Handshake {
        capabilities,
        version,
    })
}
