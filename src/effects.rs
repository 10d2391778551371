//! Explosions, dust and screen shake driven by engine events
//!
//! Positions are board pixels, the same space the engine reports events in.

use crate::block::Charge;
use crate::events::GameEvent;
use crate::randomizer::Randomizer;

const SPARKS_PER_EXPLOSION: usize = 6;
const SPARK_LIFE: f64 = 0.45;
const SPARK_SPEED: f64 = 60.0;

const DUST_PER_LANDING: usize = 2;
const DUST_LIFE: f64 = 0.3;
const DUST_SPEED: f64 = 20.0;

/// Downward pull on sparks, pixels per second squared
const SPARK_GRAVITY: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleKind {
    Spark(Charge),
    Dust,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub x: f64,
    pub y: f64,
    vx: f64,
    vy: f64,
    /// Seconds left
    pub life: f64,
    max_life: f64,
}

impl Particle {
    /// 1.0 when fresh, 0.0 when gone
    pub fn fade(&self) -> f64 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }
}

/// Decaying random offset applied to the whole board
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenShake {
    /// Peak offset in pixels
    pub intensity: f64,
    pub duration: f64,
    pub elapsed: f64,
}

impl ScreenShake {
    pub fn is_active(&self) -> bool {
        self.elapsed < self.duration
    }

    /// Current strength in pixels, falling linearly to zero
    pub fn strength(&self) -> f64 {
        if !self.is_active() || self.duration <= 0.0 {
            return 0.0;
        }
        self.intensity * (1.0 - self.elapsed / self.duration)
    }
}

pub struct Effects {
    particles: Vec<Particle>,
    shake: ScreenShake,
    rng: Randomizer,
}

impl Default for Effects {
    fn default() -> Self {
        Self::new(Randomizer::new())
    }
}

impl Effects {
    pub fn new(rng: Randomizer) -> Self {
        Self {
            particles: Vec::new(),
            shake: ScreenShake::default(),
            rng,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.shake = ScreenShake::default();
    }

    /// React to a rules engine event
    pub fn handle_event(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::Explosion { x, y, charge } => self.explosion(x, y, charge),
            GameEvent::Dust { x, y } => self.dust(x, y),
            GameEvent::BlocksRemoved { count } => {
                let count = count as f64;
                self.start_shake(count * 2.0, 0.2 + count * 0.05);
            }
            GameEvent::HardDrop { height } => {
                self.start_shake(1.0 + 0.5 * height.max(0) as f64, 0.1);
            }
        }
    }

    /// A stronger shake replaces a weaker one still running
    fn start_shake(&mut self, intensity: f64, duration: f64) {
        if self.shake.strength() > intensity {
            return;
        }
        self.shake = ScreenShake {
            intensity,
            duration,
            elapsed: 0.0,
        };
    }

    fn explosion(&mut self, x: f64, y: f64, charge: Charge) {
        for i in 0..SPARKS_PER_EXPLOSION {
            let angle = std::f64::consts::TAU * (i as f64 + self.rng.unit()) / SPARKS_PER_EXPLOSION as f64;
            let speed = SPARK_SPEED * (0.5 + self.rng.unit());
            self.particles.push(Particle {
                kind: ParticleKind::Spark(charge),
                x,
                y,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                life: SPARK_LIFE,
                max_life: SPARK_LIFE,
            });
        }
    }

    fn dust(&mut self, x: f64, y: f64) {
        for i in 0..DUST_PER_LANDING {
            let side = if i % 2 == 0 { -1.0 } else { 1.0 };
            self.particles.push(Particle {
                kind: ParticleKind::Dust,
                x,
                y,
                vx: side * DUST_SPEED * (0.5 + self.rng.unit()),
                vy: -DUST_SPEED * 0.5,
                life: DUST_LIFE,
                max_life: DUST_LIFE,
            });
        }
    }

    /// Advance particles and the shake
    pub fn update(&mut self, dt: f64) {
        for particle in &mut self.particles {
            particle.x += particle.vx * dt;
            particle.y += particle.vy * dt;
            if matches!(particle.kind, ParticleKind::Spark(_)) {
                particle.vy += SPARK_GRAVITY * dt;
            }
            particle.life -= dt;
        }
        self.particles.retain(|p| p.life > 0.0);

        if self.shake.is_active() {
            self.shake.elapsed += dt;
        }
    }

    /// Random (x, y) pixel offset for this frame
    pub fn shake_offset(&mut self) -> (f64, f64) {
        let strength = self.shake.strength();
        if strength <= 0.0 {
            return (0.0, 0.0);
        }
        let dx = (self.rng.unit() * 2.0 - 1.0) * strength;
        let dy = (self.rng.unit() * 2.0 - 1.0) * strength;
        (dx, dy)
    }
}
