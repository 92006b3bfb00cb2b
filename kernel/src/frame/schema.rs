//! Field layout of a suspended task's stack frame.
//!
//! One table lists every register that can be part of a context, with the
//! profile it belongs to and the placeholder the builder writes for it.
//! The table is resolved at compile time into one field list per profile,
//! so nothing checks the profile field by field at run time.

use khal::Sfr;

use crate::config::TargetProfile;

/// Which profiles carry a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    ExtendedOnly,
}

impl Presence {
    pub const fn includes(self, profile: TargetProfile) -> bool {
        match self {
            Presence::Always => true,
            Presence::ExtendedOnly => matches!(profile, TargetProfile::Extended),
        }
    }
}

/// One byte-wide register field of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextField {
    pub register: Sfr,
    /// Value a freshly built frame carries. Only TBLPTRU's zero matters:
    /// table reads on big parts must not start in the upper 64 KiB.
    pub initial: u8,
    pub presence: Presence,
}

const fn field(register: Sfr, initial: u8, presence: Presence) -> ContextField {
    ContextField { register, initial, presence }
}

/// Every context field, in save order.
pub const CONTEXT_FIELDS: [ContextField; 15] = [
    field(Sfr::Status, 0x11, Presence::Always),
    field(Sfr::Wreg, 0x22, Presence::Always),
    field(Sfr::Bsr, 0x33, Presence::Always),
    field(Sfr::Prodh, 0x44, Presence::Always),
    field(Sfr::Prodl, 0x55, Presence::Always),
    field(Sfr::Fsr0h, 0x66, Presence::Always),
    field(Sfr::Fsr0l, 0x77, Presence::Always),
    field(Sfr::Fsr1h, 0x88, Presence::Always),
    field(Sfr::Fsr1l, 0x99, Presence::Always),
    field(Sfr::Tablat, 0xAA, Presence::Always),
    field(Sfr::Tblptru, 0x00, Presence::ExtendedOnly),
    field(Sfr::Tblptrh, 0xCC, Presence::Always),
    field(Sfr::Tblptrl, 0xDD, Presence::Always),
    field(Sfr::Pclatu, 0xEE, Presence::ExtendedOnly),
    field(Sfr::Pclath, 0xFF, Presence::Always),
];

const fn count_fields(profile: TargetProfile) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < CONTEXT_FIELDS.len() {
        if CONTEXT_FIELDS[i].presence.includes(profile) {
            n += 1;
        }
        i += 1;
    }
    n
}

const fn select_fields<const N: usize>(profile: TargetProfile) -> [ContextField; N] {
    let mut out = [CONTEXT_FIELDS[0]; N];
    let mut n = 0;
    let mut i = 0;
    while i < CONTEXT_FIELDS.len() {
        if CONTEXT_FIELDS[i].presence.includes(profile) {
            out[n] = CONTEXT_FIELDS[i];
            n += 1;
        }
        i += 1;
    }
    assert!(n == N, "field count does not match the profile");
    out
}

const BASE_FIELD_COUNT: usize = count_fields(TargetProfile::Base);
const EXTENDED_FIELD_COUNT: usize = count_fields(TargetProfile::Extended);

static BASE_FIELDS: [ContextField; BASE_FIELD_COUNT] = select_fields(TargetProfile::Base);
static EXTENDED_FIELDS: [ContextField; EXTENDED_FIELD_COUNT] =
    select_fields(TargetProfile::Extended);

/// Resolved frame layout for one profile.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameSchema {
    pub profile: TargetProfile,
    /// Register fields in save order.
    pub context: &'static [ContextField],
    /// Bytes per return-address entry (TOSH:TOSL, plus TOSU when extended).
    pub return_entry_bytes: u8,
}

pub static BASE_SCHEMA: FrameSchema = FrameSchema {
    profile: TargetProfile::Base,
    context: &BASE_FIELDS,
    return_entry_bytes: 2,
};

pub static EXTENDED_SCHEMA: FrameSchema = FrameSchema {
    profile: TargetProfile::Extended,
    context: &EXTENDED_FIELDS,
    return_entry_bytes: 3,
};

impl FrameSchema {
    pub fn for_profile(profile: TargetProfile) -> &'static FrameSchema {
        match profile {
            TargetProfile::Base => &BASE_SCHEMA,
            TargetProfile::Extended => &EXTENDED_SCHEMA,
        }
    }

    /// Bytes taken by the register fields.
    pub fn context_bytes(&self) -> usize {
        self.context.len()
    }

    /// Bytes a saved frame occupies with `chain_depth` return entries,
    /// not counting the builder's parameter.
    pub fn frame_bytes(&self, scratch_len: usize, chain_depth: usize) -> usize {
        self.context_bytes()
            + scratch_len
            + chain_depth * self.return_entry_bytes as usize
            + 1 // chain depth
            + 1 // nesting
    }
}
