extern crate num;

use num::traits::Inv;
use num::Float;
use num::Num;
use std::f64::consts::PI;
use std::fmt;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// Rapidity assigned to momenta along the beam axis, where the true value diverges.
pub const MAX_RAPIDITY: f64 = 1e5;

pub trait Field
where
    Self: Num,
    Self: Mul<Self, Output = Self>,
    Self: MulAssign<Self>,
    Self: AddAssign<Self>,
    Self: SubAssign<Self>,
    Self: Div<Self, Output = Self>,
    Self: Add<Self, Output = Self>,
    Self: Sub<Self, Output = Self>,
    Self: Neg<Output = Self>,
    Self: Inv<Output = Self>,
    Self: Sum<Self>,
    Self: PartialEq,
    Self: Copy,
    Self: Default,
    Self: Debug,
    Self: Display,
{
}

impl Field for f32 {}
impl Field for f64 {}

/// A four-vector `(t, x, y, z)` with metric `(+, -, -, -)`.
///
/// For collider momenta `t` is the energy and `z` points along the beam axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LorentzVector<T: Field> {
    pub t: T,
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Field> Default for LorentzVector<T> {
    fn default() -> LorentzVector<T> {
        LorentzVector {
            t: T::default(),
            x: T::default(),
            y: T::default(),
            z: T::default(),
        }
    }
}

impl<T: Field> Display for LorentzVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(t:{}, x:{}, y:{}, z:{})",
            self.t, self.x, self.y, self.z
        )
    }
}

impl<T: Field> LorentzVector<T> {
    #[inline]
    pub fn from_args(t: T, x: T, y: T, z: T) -> LorentzVector<T> {
        LorentzVector { t, x, y, z }
    }

    #[inline]
    pub fn square(&self) -> T {
        self.t * self.t - self.x * self.x - self.y * self.y - self.z * self.z
    }

    #[inline]
    pub fn spatial_squared(&self) -> T {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn spatial_dot(&self, other: &LorentzVector<T>) -> T {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn map<F, U: Field>(&self, map: F) -> LorentzVector<U>
    where
        F: Fn(T) -> U,
    {
        LorentzVector {
            t: map(self.t),
            x: map(self.x),
            y: map(self.y),
            z: map(self.z),
        }
    }

    #[inline]
    fn zip_map<F>(&self, other: &LorentzVector<T>, f: F) -> LorentzVector<T>
    where
        F: Fn(T, T) -> T,
    {
        LorentzVector {
            t: f(self.t, other.t),
            x: f(self.x, other.x),
            y: f(self.y, other.y),
            z: f(self.z, other.z),
        }
    }
}

macro_rules! impl_vector_op {
    ($Op:ident, $op:ident, $tok:tt) => {
        impl<'a, T: Field> $Op<&'a LorentzVector<T>> for &'a LorentzVector<T> {
            type Output = LorentzVector<T>;

            #[inline]
            fn $op(self, other: &'a LorentzVector<T>) -> LorentzVector<T> {
                self.zip_map(other, |a, b| a $tok b)
            }
        }

        impl<'a, T: Field> $Op<LorentzVector<T>> for &'a LorentzVector<T> {
            type Output = LorentzVector<T>;

            #[inline]
            fn $op(self, other: LorentzVector<T>) -> LorentzVector<T> {
                self.zip_map(&other, |a, b| a $tok b)
            }
        }

        impl<'a, T: Field> $Op<&'a LorentzVector<T>> for LorentzVector<T> {
            type Output = LorentzVector<T>;

            #[inline]
            fn $op(self, other: &'a LorentzVector<T>) -> LorentzVector<T> {
                self.zip_map(other, |a, b| a $tok b)
            }
        }

        impl<T: Field> $Op<LorentzVector<T>> for LorentzVector<T> {
            type Output = LorentzVector<T>;

            #[inline]
            fn $op(self, other: LorentzVector<T>) -> LorentzVector<T> {
                self.zip_map(&other, |a, b| a $tok b)
            }
        }
    };
}

impl_vector_op!(Add, add, +);
impl_vector_op!(Sub, sub, -);

impl<T: Field> AddAssign<LorentzVector<T>> for LorentzVector<T> {
    #[inline]
    fn add_assign(&mut self, other: LorentzVector<T>) {
        self.t += other.t;
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl<T: Field> Neg for LorentzVector<T> {
    type Output = LorentzVector<T>;

    #[inline]
    fn neg(self) -> LorentzVector<T> {
        self.map(|c| -c)
    }
}

impl<'a, T: Field> Mul<T> for &'a LorentzVector<T> {
    type Output = LorentzVector<T>;

    #[inline]
    fn mul(self, other: T) -> LorentzVector<T> {
        self.map(|c| c * other)
    }
}

impl<'a, T: Field> Div<T> for &'a LorentzVector<T> {
    type Output = LorentzVector<T>;

    #[inline]
    fn div(self, other: T) -> LorentzVector<T> {
        self * other.inv()
    }
}

impl<T: Field> Sum for LorentzVector<T> {
    fn sum<I: Iterator<Item = LorentzVector<T>>>(iter: I) -> LorentzVector<T> {
        iter.fold(LorentzVector::default(), |acc, p| acc + p)
    }
}

impl<'a, T: Field> Sum<&'a LorentzVector<T>> for LorentzVector<T> {
    fn sum<I: Iterator<Item = &'a LorentzVector<T>>>(iter: I) -> LorentzVector<T> {
        iter.fold(LorentzVector::default(), |acc, p| acc + p)
    }
}

impl<T: Float + Field> LorentzVector<T> {
    #[inline]
    pub fn spatial_distance(&self) -> T {
        self.spatial_squared().sqrt()
    }

    /// Boost by the velocity stored in the spatial part of `boost_vector`.
    pub fn boost(&self, boost_vector: &LorentzVector<T>) -> LorentzVector<T> {
        let b2 = boost_vector.spatial_squared();
        let gamma = (T::one() - b2).sqrt().inv();

        let bp = self.spatial_dot(boost_vector);
        let gamma2 = if b2 > T::zero() {
            (gamma - T::one()) / b2
        } else {
            T::zero()
        };
        let factor = gamma2 * bp + gamma * self.t;
        LorentzVector::from_args(
            gamma * (self.t + bp),
            boost_vector.x.mul_add(factor, self.x),
            boost_vector.y.mul_add(factor, self.y),
            boost_vector.z.mul_add(factor, self.z),
        )
    }
}

/// Collider kinematics. Angles are in radians, the beam runs along `z`.
impl LorentzVector<f64> {
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, m: f64) -> LorentzVector<f64> {
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (x, y, z) = (pt * cos_phi, pt * sin_phi, pt * eta.sinh());
        let t = (x * x + y * y + z * z + m * m).sqrt();
        LorentzVector { t, x, y, z }
    }

    /// The velocity of a system with this momentum, usable as a `boost` argument.
    #[inline]
    pub fn velocity(&self) -> LorentzVector<f64> {
        self / self.t
    }

    #[inline]
    pub fn pt2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn pt(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Azimuth in `(-pi, pi]`; zero for a vector along the beam.
    #[inline]
    pub fn phi(&self) -> f64 {
        if self.x == 0. && self.y == 0. {
            0.
        } else {
            self.y.atan2(self.x)
        }
    }

    /// Pseudorapidity.
    pub fn eta(&self) -> f64 {
        let pt = self.pt();
        if pt == 0. {
            if self.z == 0. {
                0.
            } else {
                MAX_RAPIDITY.copysign(self.z)
            }
        } else {
            (self.z / pt).asinh()
        }
    }

    pub fn rapidity(&self) -> f64 {
        if self.t <= self.z.abs() {
            if self.z == 0. {
                0.
            } else {
                MAX_RAPIDITY.copysign(self.z)
            }
        } else {
            0.5 * ((self.t + self.z) / (self.t - self.z)).ln()
        }
    }

    /// Invariant mass, negative for space-like vectors.
    pub fn mass(&self) -> f64 {
        signed_sqrt(self.square())
    }

    /// Transverse mass `sqrt(E^2 - pz^2)`, negative when `|pz| > E`.
    pub fn transverse_mass(&self) -> f64 {
        signed_sqrt(self.t * self.t - self.z * self.z)
    }

    /// Azimuthal separation in `[0, pi]`.
    pub fn delta_phi(&self, other: &LorentzVector<f64>) -> f64 {
        let d = (self.phi() - other.phi()).abs();
        if d > PI {
            2. * PI - d
        } else {
            d
        }
    }

    /// Separation in the rapidity-azimuth plane.
    pub fn delta_r(&self, other: &LorentzVector<f64>) -> f64 {
        let dy = self.rapidity() - other.rapidity();
        let dphi = self.delta_phi(other);
        (dy * dy + dphi * dphi).sqrt()
    }
}

#[inline]
fn signed_sqrt(x: f64) -> f64 {
    if x < 0. {
        -(-x).sqrt()
    } else {
        x.sqrt()
    }
}

#[test]
fn kinematics() {
    let eps = 1e-9;

    let p = LorentzVector::from_pt_eta_phi_m(50., 1.2, -2.0, 10.);
    assert!((p.pt() - 50.).abs() < eps);
    assert!((p.eta() - 1.2).abs() < eps);
    assert!((p.phi() + 2.0).abs() < eps);
    assert!((p.mass() - 10.).abs() < 1e-6);
    assert!(p.rapidity() < p.eta());

    let a = LorentzVector::from_args(10., 3., 0., 0.);
    let b = LorentzVector::from_args(10., -3., 0., 0.);
    assert_eq!(&a + &b, LorentzVector::from_args(20., 0., 0., 0.));
    assert_eq!(a - b, LorentzVector::from_args(0., 6., 0., 0.));
    assert_eq!(-a, LorentzVector::from_args(-10., -3., 0., 0.));
    assert_eq!(vec![a, b].iter().sum::<LorentzVector<f64>>(), a + b);
    assert!(((a + b).mass() - 20.).abs() < eps);

    // azimuthal differences wrap around
    let c = LorentzVector::from_pt_eta_phi_m(1., 0., 3.0, 0.);
    let d = LorentzVector::from_pt_eta_phi_m(1., 0., -3.0, 0.);
    assert!((c.delta_phi(&d) - (2. * PI - 6.0)).abs() < eps);

    let beam = LorentzVector::from_args(5., 0., 0., 5.);
    assert_eq!(beam.rapidity(), MAX_RAPIDITY);
    assert_eq!(beam.eta(), MAX_RAPIDITY);

    // boosting there and back again
    let q = LorentzVector::from_args(100., 10., -20., 30.);
    let v = LorentzVector::from_args(0., 0.1, 0.2, -0.3);
    let back = q.boost(&v).boost(&-v);
    assert!((back - q).euclidean_norm() < 1e-9);
    assert!((q.boost(&v).square() - q.square()).abs() < 1e-6);
}

#[cfg(test)]
impl LorentzVector<f64> {
    fn euclidean_norm(&self) -> f64 {
        (self.t * self.t + self.spatial_squared()).sqrt()
    }
}
