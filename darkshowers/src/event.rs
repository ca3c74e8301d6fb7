use tracing::warn;
use vector::LorentzVector;

/// PDG codes used by the pipeline, including the hidden-valley sector.
pub mod pdg {
    pub const DOWN: i32 = 1;
    pub const BOTTOM: i32 = 5;
    pub const GLUON: i32 = 21;
    pub const PHOTON: i32 = 22;
    pub const ELECTRON: i32 = 11;
    pub const MUON: i32 = 13;
    pub const PION: i32 = 211;
    pub const PION_ZERO: i32 = 111;

    pub const DARK_QUARK: i32 = 4_900_101;
    pub const DARK_GLUON: i32 = 4_900_021;
    pub const DARK_DIAGONAL_MESON: i32 = 4_900_111;
    pub const DARK_PION: i32 = 4_900_211;

    const HIDDEN_VALLEY_OFFSET: i32 = 4_900_000;

    pub fn is_neutrino(id: i32) -> bool {
        let ida = id.abs();
        ida == 12 || ida == 14 || ida == 16
    }

    pub fn is_hidden_valley(id: i32) -> bool {
        id.abs() > HIDDEN_VALLEY_OFFSET
    }

    /// Stable particles that leave no trace in a detector.
    pub fn is_invisible(id: i32) -> bool {
        is_neutrino(id) || is_hidden_valley(id)
    }

    /// Coloured SM partons that fragment into hadrons.
    pub fn is_qcd_parton(id: i32) -> bool {
        let ida = id.abs();
        ida == GLUON || (ida >= DOWN && ida <= BOTTOM)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParticleStatus {
    Incoming,
    Intermediate,
    Decayed,
    Stable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: i32,
    pub status: ParticleStatus,
    pub momentum: LorentzVector<f64>,
    pub mother: Option<usize>,
}

impl Particle {
    pub fn new(id: i32, status: ParticleStatus, momentum: LorentzVector<f64>) -> Particle {
        Particle {
            id,
            status,
            momentum,
            mother: None,
        }
    }

    pub fn with_mother(mut self, mother: usize) -> Particle {
        self.mother = Some(mother);
        self
    }

    #[inline]
    pub fn is_final_state(&self) -> bool {
        self.status == ParticleStatus::Stable
    }
}

/// Truth-level counts read off the generator record.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TruthCounts {
    /// Invisible dark-pion pairs.
    pub n_meson: usize,
    /// Dark gluons emitted in the dark shower.
    pub n_glu: usize,
    /// Dark pions without their partner in the following record entry.
    pub n_unpaired: usize,
}

/// The particle record of one generated event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedEvent {
    pub particles: Vec<Particle>,
    pub weight: f64,
}

impl GeneratedEvent {
    pub fn new(weight: f64) -> GeneratedEvent {
        GeneratedEvent {
            particles: vec![],
            weight,
        }
    }

    /// Append a particle and return its index in the record.
    pub fn push(&mut self, particle: Particle) -> usize {
        self.particles.push(particle);
        self.particles.len() - 1
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn final_state(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_final_state())
    }

    /// Count dark gluons and invisible dark-pion pairs.
    ///
    /// A dark pion must be directly followed by its antiparticle. A pion without
    /// its partner is logged and skipped.
    pub fn truth_counts(&self) -> TruthCounts {
        let mut counts = TruthCounts::default();

        for (i, p) in self.particles.iter().enumerate() {
            if p.id == pdg::DARK_GLUON {
                counts.n_glu += 1;
            }

            if p.id != pdg::DARK_PION {
                continue;
            }

            match self.particles.get(i + 1) {
                Some(next) if next.id == -pdg::DARK_PION => counts.n_meson += 1,
                _ => {
                    warn!(index = i, "invisible dark pions not coming in pairs");
                    counts.n_unpaired += 1;
                }
            }
        }

        counts
    }
}
