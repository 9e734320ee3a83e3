//! Sound scopes and staging flags.

use crate::{Error, Result};
use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};
use serde::{Deserialize, Serialize};

/// Processing domain a recall-id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SoundScope {
    Playback,
    Sequencer,
    Notation,
    Wave,
    Midi,
}

impl SoundScope {
    /// One past the last valid scope index.
    pub const LAST: i32 = 5;

    pub const ALL: [SoundScope; 5] = [
        SoundScope::Playback,
        SoundScope::Sequencer,
        SoundScope::Notation,
        SoundScope::Wave,
        SoundScope::Midi,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<i32> for SoundScope {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        if (0..Self::LAST).contains(&value) {
            Ok(Self::ALL[value as usize])
        } else {
            Err(Error::InvalidSoundScope(value))
        }
    }
}

impl fmt::Display for SoundScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundScope::Playback => write!(f, "playback"),
            SoundScope::Sequencer => write!(f, "sequencer"),
            SoundScope::Notation => write!(f, "notation"),
            SoundScope::Wave => write!(f, "wave"),
            SoundScope::Midi => write!(f, "midi"),
        }
    }
}

/// Bitmask identifying processing stages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StageFlags(u32);

impl StageFlags {
    pub const CHECK_RT_DATA: Self = Self(1);
    pub const RUN_INIT_PRE: Self = Self(1 << 1);
    pub const RUN_INIT_INTER: Self = Self(1 << 2);
    pub const RUN_INIT_POST: Self = Self(1 << 3);
    pub const FEED_INPUT_QUEUE: Self = Self(1 << 4);
    pub const AUTOMATE: Self = Self(1 << 5);
    pub const RUN_PRE: Self = Self(1 << 6);
    pub const RUN_INTER: Self = Self(1 << 7);
    pub const RUN_POST: Self = Self(1 << 8);
    pub const DO_FEEDBACK: Self = Self(1 << 9);
    pub const FEED_OUTPUT_QUEUE: Self = Self(1 << 10);
    pub const FINI: Self = Self(1 << 11);
    pub const CANCEL: Self = Self(1 << 12);
    pub const DONE: Self = Self(1 << 13);
    pub const REMOVE: Self = Self(1 << 14);
    pub const RESET: Self = Self(1 << 15);

    const NAMES: [(StageFlags, &'static str); 16] = [
        (Self::CHECK_RT_DATA, "CHECK_RT_DATA"),
        (Self::RUN_INIT_PRE, "RUN_INIT_PRE"),
        (Self::RUN_INIT_INTER, "RUN_INIT_INTER"),
        (Self::RUN_INIT_POST, "RUN_INIT_POST"),
        (Self::FEED_INPUT_QUEUE, "FEED_INPUT_QUEUE"),
        (Self::AUTOMATE, "AUTOMATE"),
        (Self::RUN_PRE, "RUN_PRE"),
        (Self::RUN_INTER, "RUN_INTER"),
        (Self::RUN_POST, "RUN_POST"),
        (Self::DO_FEEDBACK, "DO_FEEDBACK"),
        (Self::FEED_OUTPUT_QUEUE, "FEED_OUTPUT_QUEUE"),
        (Self::FINI, "FINI"),
        (Self::CANCEL, "CANCEL"),
        (Self::DONE, "DONE"),
        (Self::REMOVE, "REMOVE"),
        (Self::RESET, "RESET"),
    ];

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// All bits of `other` are set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any bit of `other` is set.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for StageFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StageFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for StageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "StageFlags(empty)");
        }
        let mut first = true;
        write!(f, "StageFlags(")?;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// The conventional playback program: init stages, then the per-tick run stages.
pub fn default_staging_program() -> Vec<StageFlags> {
    vec![
        StageFlags::RUN_INIT_PRE,
        StageFlags::RUN_INIT_INTER,
        StageFlags::RUN_INIT_POST,
        StageFlags::FEED_INPUT_QUEUE,
        StageFlags::AUTOMATE,
        StageFlags::RUN_PRE,
        StageFlags::RUN_INTER,
        StageFlags::RUN_POST,
        StageFlags::DO_FEEDBACK,
        StageFlags::FEED_OUTPUT_QUEUE,
    ]
}
