//! Element trait for the values stored in a CSR matrix

use num_traits::{CheckedAdd, CheckedMul, Num};
use std::ops::AddAssign;

/// Trait for types that can be multiplied by the SpGEMM kernels
///
/// Implemented for the primitive integer and floating-point types.
///
/// # Overflow
///
/// The kernels only combine values through [`Element::checked_product`] and
/// [`Element::checked_sum`]. Integers return `None` when the result does not
/// fit the type; floats follow IEEE 754 and never fail (an overflowing float
/// becomes infinite).
pub trait Element: Copy + Num + AddAssign + Send + Sync + 'static {
    /// `self * rhs`, or `None` if it is not representable
    fn checked_product(self, rhs: Self) -> Option<Self>;

    /// `self + rhs`, or `None` if it is not representable
    fn checked_sum(self, rhs: Self) -> Option<Self>;
}

macro_rules! impl_integer_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn checked_product(self, rhs: Self) -> Option<Self> {
                    CheckedMul::checked_mul(&self, &rhs)
                }

                #[inline]
                fn checked_sum(self, rhs: Self) -> Option<Self> {
                    CheckedAdd::checked_add(&self, &rhs)
                }
            }
        )*
    };
}

macro_rules! impl_float_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn checked_product(self, rhs: Self) -> Option<Self> {
                    Some(self * rhs)
                }

                #[inline]
                fn checked_sum(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }
            }
        )*
    };
}

impl_integer_element!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_float_element!(f32, f64);
