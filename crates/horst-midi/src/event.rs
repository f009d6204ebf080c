//! Raw MIDI events and control-change extraction.

/// Status nibble of a control-change message.
pub const CONTROL_CHANGE: u8 = 0xB0;

/// Raw 3-byte MIDI event as delivered by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawMidiEvent {
    /// Offset within the current cycle (0 = first frame).
    pub frame_offset: usize,
    pub data: [u8; 3],
    /// Valid bytes in `data` (1-3).
    pub len: u8,
}

impl RawMidiEvent {
    #[inline]
    pub fn new(frame_offset: usize, data: [u8; 3], len: u8) -> Self {
        Self {
            frame_offset,
            data,
            len,
        }
    }

    /// Copy up to three bytes. `None` for empty or longer messages (sysex).
    pub fn from_bytes(frame_offset: usize, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut data = [0u8; 3];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self::new(frame_offset, data, bytes.len() as u8))
    }

    /// Build a control-change message. `channel` is 0-based.
    #[inline]
    pub fn control_change(frame_offset: usize, channel: u8, controller: u8, value: u8) -> Self {
        Self::new(
            frame_offset,
            [CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            3,
        )
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.data[0] & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0F
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..(self.len as usize).min(3)]
    }

    /// Decode as a control change, if it is one.
    #[inline]
    pub fn as_control_change(&self) -> Option<ControlChange> {
        if self.len != 3 || self.status() != CONTROL_CHANGE {
            return None;
        }
        Some(ControlChange {
            frame_offset: self.frame_offset,
            channel: self.channel(),
            controller: self.data[1],
            value: self.data[2],
        })
    }
}

/// Decoded control-change message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlChange {
    pub frame_offset: usize,
    /// 0-15.
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl ControlChange {
    /// Value scaled to `0.0..=1.0`.
    #[inline]
    pub fn normalized(&self) -> f32 {
        self.value as f32 / 127.0
    }
}

impl From<ControlChange> for RawMidiEvent {
    fn from(cc: ControlChange) -> Self {
        RawMidiEvent::control_change(cc.frame_offset, cc.channel, cc.controller, cc.value)
    }
}
