use std::fmt::Debug;
use std::ops::{Add, Div, Mul};

/// Counts past this keep weighting new samples at `1 / (MAX_AVERAGE_COUNT + 1)`,
/// which keeps `count * average` inside the accumulator for every sample type.
pub const MAX_AVERAGE_COUNT: usize = u32::MAX as usize;

/// Numeric type a frame can carry through the averaging stages.
pub trait Sample: Copy + Debug + PartialEq + Send + 'static {
    /// Wide type the running average is computed in.
    type Acc: Copy + Add<Output = Self::Acc> + Mul<Output = Self::Acc> + Div<Output = Self::Acc>;

    fn zero() -> Self;

    fn widen(self) -> Self::Acc;

    /// Back from the accumulator, saturating at the type's bounds.
    fn narrow(acc: Self::Acc) -> Self;

    fn count_to_acc(count: usize) -> Self::Acc;
}

macro_rules! impl_float_sample {
    ($($t:ty),* $(,)?) => {
        $(
            impl Sample for $t {
                type Acc = f64;

                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn widen(self) -> f64 {
                    f64::from(self)
                }

                #[inline]
                fn narrow(acc: f64) -> Self {
                    acc as $t
                }

                #[inline]
                fn count_to_acc(count: usize) -> f64 {
                    count as f64
                }
            }
        )*
    };
}

macro_rules! impl_int_sample {
    ($($t:ty),* $(,)?) => {
        $(
            impl Sample for $t {
                type Acc = i128;

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn widen(self) -> i128 {
                    i128::from(self)
                }

                #[inline]
                fn narrow(acc: i128) -> Self {
                    <$t>::try_from(acc).unwrap_or(if acc < 0 { <$t>::MIN } else { <$t>::MAX })
                }

                #[inline]
                fn count_to_acc(count: usize) -> i128 {
                    i128::try_from(count).unwrap_or(i128::MAX)
                }
            }
        )*
    };
}

impl_float_sample!(f32, f64);
impl_int_sample!(i16, i32, i64, u8, u16, u32, u64);

/// Folds `value` into an average that already covers `count` samples.
///
/// With `count == 0` the result is `value` itself. Integer averages truncate
/// toward zero on every fold.
#[inline]
pub fn add_to_average<T: Sample>(current_average: T, value: T, count: usize) -> T {
    let count = count.min(MAX_AVERAGE_COUNT);
    let size = T::count_to_acc(count);
    let folded = (size * current_average.widen() + value.widen()) / (size + T::count_to_acc(1));
    T::narrow(folded)
}
