//! Override state of a property or item.

use std::fmt;

use bitflags::bitflags;

use crate::constants::{NEW_POSTFIX, SEALED_POSTFIX};

bitflags! {
    /// Override state of a member value, a collection item or a dictionary key.
    ///
    /// The empty set is [`OverrideType::BASE`]: the value follows the base.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct OverrideType: u8 {
        /// The value was changed in the derived asset.
        const NEW = 0b01;
        /// The value must not follow the base, even if it is not changed.
        const SEALED = 0b10;
    }
}

impl OverrideType {
    pub const BASE: OverrideType = OverrideType::empty();

    pub fn is_base(self) -> bool {
        self.is_empty()
    }

    pub fn is_new(self) -> bool {
        self.contains(OverrideType::NEW)
    }

    pub fn is_sealed(self) -> bool {
        self.contains(OverrideType::SEALED)
    }

    /// Marker appended to a name or id in the text format.
    pub fn postfix(self) -> String {
        let mut postfix = String::new();
        if self.is_new() {
            postfix.push(NEW_POSTFIX);
        }
        if self.is_sealed() {
            postfix.push(SEALED_POSTFIX);
        }
        postfix
    }
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_new(), self.is_sealed()) {
            (false, false) => write!(f, "Base"),
            (true, false) => write!(f, "New"),
            (false, true) => write!(f, "Sealed"),
            (true, true) => write!(f, "New, Sealed"),
        }
    }
}
