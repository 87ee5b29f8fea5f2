//! Seed derivation and the per-scenario generator.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Independent random sub-streams within one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubStream {
    /// Independent normals fed through the correlation factor.
    Factors,
    /// Per-tranche idiosyncratic asset shocks.
    Idiosyncratic,
}

impl SubStream {
    #[inline]
    fn id(self) -> u64 {
        match self {
            SubStream::Factors => 1,
            SubStream::Idiosyncratic => 2,
        }
    }
}

/// SplitMix64 finaliser.
#[inline]
pub(crate) fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive a 64-bit seed from the scenario coordinates.
#[inline]
pub fn derive_seed(master_seed: u64, group: usize, index: usize, stream: SubStream) -> u64 {
    let mut h = splitmix64(master_seed);
    h = splitmix64(h ^ group as u64);
    h = splitmix64(h ^ index as u64);
    splitmix64(h ^ stream.id())
}

/// Seeded generator for one scenario sub-stream.
///
/// # Examples
///
/// ```
/// use tranche_pricing::rng::{ScenarioRng, SubStream};
///
/// let mut a = ScenarioRng::new(42, 0, 7, SubStream::Factors);
/// let mut b = ScenarioRng::new(42, 0, 7, SubStream::Factors);
/// assert_eq!(a.gen_normal(), b.gen_normal());
/// ```
pub struct ScenarioRng {
    inner: StdRng,
}

impl ScenarioRng {
    /// Generator for `(master_seed, group, index, stream)`.
    #[inline]
    pub fn new(master_seed: u64, group: usize, index: usize, stream: SubStream) -> Self {
        Self {
            inner: StdRng::seed_from_u64(derive_seed(master_seed, group, index, stream)),
        }
    }

    /// One standard normal draw.
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }

    /// Fill `buffer` with standard normal draws.
    #[inline]
    pub fn fill_normal(&mut self, buffer: &mut [f64]) {
        for value in buffer.iter_mut() {
            *value = StandardNormal.sample(&mut self.inner);
        }
    }
}
