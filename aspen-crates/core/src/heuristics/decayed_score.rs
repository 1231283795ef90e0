/// An activity which decays lazily: it stores the value of the global decay counter at the
/// moment it was last normalised, and loses two bits for every increment of the counter since.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DecayedScore {
    activity: u32,
    decayed_at: u32,
}

impl DecayedScore {
    /// The activity as of the global decay counter `decay`.
    pub(crate) fn value(self, decay: u32) -> u32 {
        let shift = decay.saturating_sub(self.decayed_at).saturating_mul(2);
        if shift >= u32::BITS {
            0
        } else {
            self.activity >> shift
        }
    }

    /// Brings the stored activity up to date with `decay` and adds `amount` to it.
    pub(crate) fn bump(&mut self, decay: u32, amount: u32) {
        self.activity = self.value(decay).saturating_add(amount);
        self.decayed_at = decay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_decays_by_two_bits_per_step() {
        let mut score = DecayedScore::default();
        score.bump(3, 16);

        assert_eq!(score.value(3), 16);
        assert_eq!(score.value(4), 4);
        assert_eq!(score.value(5), 1);
        assert_eq!(score.value(40), 0);
        // Reading does not change the score.
        assert_eq!(score.value(3), 16);
    }

    #[test]
    fn bumping_normalises_first() {
        let mut score = DecayedScore::default();
        score.bump(0, 8);
        score.bump(1, 1);

        assert_eq!(score.value(1), 3);
    }
}
