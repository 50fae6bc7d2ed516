use crate::symbol::{fx_map, FxMap};

/// Condition flags.
///
/// Only `zero`, `sign` and `parity` are derived from results, and `carry` is only written by
/// `cmp`. `overflow` and `auxiliary` are never computed and keep their reset value.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Flags {
    pub zero: bool,
    pub sign: bool,
    pub carry: bool,
    pub overflow: bool,
    pub auxiliary: bool,
    pub parity: bool,
}

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute ZF, SF and PF from `result` truncated to `width` bits.
    pub fn update(&mut self, result: u32, width: u32) {
        debug_assert!(width == 8 || width == 16);
        let masked = result & ((1 << width) - 1);
        self.zero = masked == 0;
        self.sign = masked & (1 << (width - 1)) != 0;
        self.parity = masked.count_ones() % 2 == 0;
    }

    pub fn set_carry(&mut self, carry: bool) {
        self.carry = carry;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Named view in display order.
    pub fn snapshot(&self) -> FxMap<&'static str, bool> {
        let mut map = fx_map();
        map.insert("ZF", self.zero);
        map.insert("SF", self.sign);
        map.insert("CF", self.carry);
        map.insert("OF", self.overflow);
        map.insert("AF", self.auxiliary);
        map.insert("PF", self.parity);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_result() {
        let mut flags = Flags::new();
        flags.update(0, 8);
        assert!(flags.zero);
        assert!(!flags.sign);
        assert!(flags.parity);
    }

    #[test]
    fn sign_depends_on_width() {
        let mut flags = Flags::new();
        flags.update(0xFF, 8);
        assert!(flags.sign);
        assert!(!flags.zero);
        assert!(flags.parity);
        flags.update(0xFF, 16);
        assert!(!flags.sign);
    }

    #[test]
    fn result_is_masked() {
        let mut flags = Flags::new();
        flags.update(0x100, 8);
        assert!(flags.zero);
        flags.update(0x1_0001, 16);
        assert!(!flags.zero);
        assert!(!flags.parity);
    }

    #[test]
    fn update_leaves_other_flags() {
        let mut flags = Flags::new();
        flags.set_carry(true);
        flags.update(0x80, 8);
        assert!(flags.carry);
        assert!(!flags.overflow);
        assert!(!flags.auxiliary);
    }

    #[test]
    fn snapshot_order() {
        let flags = Flags {
            zero: true,
            parity: true,
            ..Flags::default()
        };
        let snapshot = flags.snapshot();
        let names: Vec<_> = snapshot.keys().copied().collect();
        assert_eq!(names, ["ZF", "SF", "CF", "OF", "AF", "PF"]);
        assert_eq!(snapshot["ZF"], true);
        assert_eq!(snapshot["CF"], false);
        assert_eq!(snapshot["PF"], true);
    }
}
